//! `blueprint diff`: show unified diffs for what synth would write.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use blueprint_core::Settings;
use blueprint_sync::diff_pipeline;

use super::{ConfigArgs, DEFAULT_OUT_DIR};

/// Arguments for `blueprint diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Output directory to compare against.
    #[arg(short = 'o', long = "out", value_name = "DIR", default_value = DEFAULT_OUT_DIR)]
    pub out: PathBuf,

    /// Directory of `.tera` files overriding the built-in templates.
    #[arg(long, value_name = "DIR")]
    pub templates: Option<PathBuf>,
}

impl DiffArgs {
    pub fn run(self, settings: &Settings) -> Result<()> {
        let spec = self.config.build(settings)?;
        let result = diff_pipeline(&spec, &self.out, self.templates.as_deref())
            .with_context(|| format!("diff failed for '{}'", self.out.display()))?;

        if result.is_clean() {
            println!("No differences for '{}'.", result.pipeline_name);
            return Ok(());
        }

        for diff in result.diffs {
            print!("{}", diff.unified_diff);
            if !diff.unified_diff.ends_with('\n') {
                println!();
            }
        }

        Ok(())
    }
}
