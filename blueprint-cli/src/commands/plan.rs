//! `blueprint plan`: stage-by-stage view of the assembled pipeline.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use blueprint_core::{BootstrapDescriptor, EnvironmentStage, PipelineSpec, Settings};

use super::ConfigArgs;

/// Arguments for `blueprint plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Emit the full pipeline as JSON.
    #[arg(long)]
    pub json: bool,
}

impl PlanArgs {
    pub fn run(self, settings: &Settings) -> Result<()> {
        let spec = self.config.build(settings)?;
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&spec).context("failed to serialize pipeline JSON")?
            );
            return Ok(());
        }

        print_table(&spec)
    }
}

#[derive(Tabled)]
struct StageRow {
    #[tabled(rename = "#")]
    order: usize,
    #[tabled(rename = "stage")]
    stage: String,
    #[tabled(rename = "region")]
    region: String,
    #[tabled(rename = "account")]
    account: String,
    #[tabled(rename = "cluster")]
    cluster: String,
    #[tabled(rename = "teams")]
    teams: usize,
    #[tabled(rename = "add-ons")]
    add_ons: usize,
    #[tabled(rename = "bootstrap")]
    bootstrap: String,
}

fn stage_row(order: usize, stage: &EnvironmentStage) -> Result<StageRow> {
    let bp = &stage.blueprint;
    let bootstrap = stage
        .extra_add_ons
        .iter()
        .find_map(BootstrapDescriptor::from_add_on)
        .transpose()
        .with_context(|| format!("stage '{}' has a malformed bootstrap add-on", stage.id))?
        .map(|d| format!("{} @ {}", d.path, d.revision))
        .unwrap_or_else(|| "-".to_string());

    Ok(StageRow {
        order,
        stage: stage.id.0.clone(),
        region: stage.region.clone(),
        account: bp.account().to_string(),
        cluster: format!(
            "{} {}",
            bp.cluster_provider().kind(),
            bp.cluster_provider().version()
        ),
        teams: bp.teams().len(),
        add_ons: bp.add_ons().len(),
        bootstrap,
    })
}

fn print_table(spec: &PipelineSpec) -> Result<()> {
    println!(
        "{} {} | owner {} | repo {}@{}",
        "Pipeline".bold(),
        spec.name.bold(),
        spec.owner,
        spec.repository.repo_url,
        spec.repository.target_revision,
    );

    let rows = spec
        .stages
        .iter()
        .enumerate()
        .map(|(i, stage)| stage_row(i + 1, stage))
        .collect::<Result<Vec<_>>>()?;

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    println!(
        "{}",
        format!("wave '{}' promotes stages top to bottom", spec.wave).bright_black()
    );
    Ok(())
}
