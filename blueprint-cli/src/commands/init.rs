//! `blueprint init [--path P] [--force]`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use blueprint_core::config;

/// Write the reference pipeline configuration.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Where to write the configuration file.
    #[arg(long, short = 'p', default_value = config::DEFAULT_CONFIG_FILE)]
    pub path: PathBuf,

    /// Replace an existing file.
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let cfg = config::scaffold_at(&self.path, self.force)
            .with_context(|| format!("failed to write '{}'", self.path.display()))?;

        println!(
            "✓ Wrote pipeline '{}' to {}",
            cfg.pipeline.name,
            self.path.display()
        );
        println!(
            "  {} environments, {} teams. Set {} or pass --account before `blueprint synth`.",
            cfg.environments.len(),
            cfg.teams.len(),
            config::ACCOUNT_VAR
        );
        Ok(())
    }
}
