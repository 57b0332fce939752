//! `blueprint validate`: assemble the pipeline and report.

use anyhow::Result;
use clap::Args;

use blueprint_core::Settings;

use super::ConfigArgs;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

impl ValidateArgs {
    pub fn run(self, settings: &Settings) -> Result<()> {
        let spec = self.config.build(settings)?;
        let order: Vec<&str> = spec.stages.iter().map(|s| s.id.0.as_str()).collect();
        println!(
            "✓ Pipeline '{}' is valid: {} stages ({})",
            spec.name,
            spec.stages.len(),
            order.join(" → ")
        );
        Ok(())
    }
}
