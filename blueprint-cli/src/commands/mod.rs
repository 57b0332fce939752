pub mod bootstrap;
pub mod diff;
pub mod init;
pub mod plan;
pub mod synth;
pub mod validate;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use blueprint_core::{config, PipelineConfig, PipelineSpec, Settings};

/// Default directory `synth` and `diff` work against.
pub const DEFAULT_OUT_DIR: &str = "blueprint.out";

/// `-c/--config`, shared by every command that reads the pipeline file.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Pipeline configuration file.
    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        default_value = config::DEFAULT_CONFIG_FILE
    )]
    pub config: PathBuf,
}

impl ConfigArgs {
    pub fn load(&self) -> Result<PipelineConfig> {
        config::load_at(&self.config).with_context(|| {
            format!(
                "failed to load '{}'; run `blueprint init` to create one",
                self.config.display()
            )
        })
    }

    /// Load and assemble the pipeline.
    pub fn build(&self, settings: &Settings) -> Result<PipelineSpec> {
        self.load()?
            .build(settings)
            .with_context(|| format!("invalid pipeline in '{}'", self.config.display()))
    }
}
