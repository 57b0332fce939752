//! `blueprint synth`: render and write the pipeline manifests.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use blueprint_core::Settings;
use blueprint_sync::{synth, SynthOptions, SynthResult, WriteResult};

use super::{ConfigArgs, DEFAULT_OUT_DIR};

/// Arguments for `blueprint synth`.
#[derive(Args, Debug)]
pub struct SynthArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Output directory.
    #[arg(short = 'o', long = "out", value_name = "DIR", default_value = DEFAULT_OUT_DIR)]
    pub out: PathBuf,

    /// Directory of `.tera` files overriding the built-in templates.
    #[arg(long, value_name = "DIR")]
    pub templates: Option<PathBuf>,

    /// Show what would be written without actually writing any files.
    #[arg(long)]
    pub dry_run: bool,
}

impl SynthArgs {
    pub fn run(self, settings: &Settings) -> Result<()> {
        let spec = self.config.build(settings)?;
        let options = SynthOptions {
            dry_run: self.dry_run,
            templates: self.templates,
        };
        let result = synth(&spec, &self.out, &options)
            .with_context(|| format!("synth failed for '{}'", self.out.display()))?;
        print_results(&result, self.dry_run);
        Ok(())
    }
}

fn print_results(result: &SynthResult, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    let changed = result.writes.len() - result.unchanged();

    if changed == 0 {
        println!(
            "{prefix}✓ '{}': nothing to do ({} unchanged)",
            result.pipeline_name,
            result.unchanged()
        );
        return;
    }

    println!(
        "{prefix}✓ '{}' synthesized ({} written, {} unchanged)",
        result.pipeline_name,
        changed,
        result.unchanged()
    );

    for r in &result.writes {
        match r {
            WriteResult::Written { path } => println!("  ✎  {}", path.display()),
            WriteResult::WouldWrite { path } => println!("  ~  {}", path.display()),
            WriteResult::Unchanged { path } => println!("  ·  {}", path.display()),
        }
    }
}
