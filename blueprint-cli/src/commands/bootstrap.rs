//! `blueprint bootstrap <env>`: print one environment's bootstrap descriptor.

use anyhow::{bail, Context, Result};
use clap::Args;

use blueprint_core::{BootstrapDescriptor, Settings};

use super::ConfigArgs;

#[derive(Args, Debug)]
pub struct BootstrapArgs {
    /// Environment id, e.g. `dev`.
    pub environment: String,

    #[command(flatten)]
    pub config: ConfigArgs,
}

impl BootstrapArgs {
    pub fn run(self, settings: &Settings) -> Result<()> {
        let spec = self.config.build(settings)?;

        let Some(stage) = spec.stage(&self.environment) else {
            let known: Vec<&str> = spec.stages.iter().map(|s| s.id.0.as_str()).collect();
            bail!(
                "unknown environment '{}'; configured: {}",
                self.environment,
                known.join(", ")
            );
        };

        let descriptor = stage
            .extra_add_ons
            .iter()
            .find_map(BootstrapDescriptor::from_add_on)
            .transpose()
            .context("malformed bootstrap add-on")?;
        let Some(descriptor) = descriptor else {
            bail!(
                "environment '{}' has bootstrapping disabled",
                self.environment
            );
        };

        println!(
            "{}",
            serde_json::to_string_pretty(&descriptor)
                .context("failed to serialize bootstrap descriptor")?
        );
        Ok(())
    }
}
