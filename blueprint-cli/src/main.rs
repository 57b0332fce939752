//! blueprint: multi-environment cluster pipeline assembly CLI.
//!
//! # Usage
//!
//! ```text
//! blueprint [--account <id>] [--region <region>] [-v] <command>
//!
//! blueprint init [--path blueprint.yaml] [--force]
//! blueprint validate [-c blueprint.yaml]
//! blueprint plan [-c blueprint.yaml] [--json]
//! blueprint bootstrap <env> [-c blueprint.yaml]
//! blueprint synth [-c blueprint.yaml] [-o blueprint.out] [--templates <dir>] [--dry-run]
//! blueprint diff [-c blueprint.yaml] [-o blueprint.out] [--templates <dir>]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use blueprint_core::Settings;
use commands::{
    bootstrap::BootstrapArgs, diff::DiffArgs, init::InitArgs, plan::PlanArgs, synth::SynthArgs,
    validate::ValidateArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "blueprint",
    version,
    about = "Assemble and synthesize multi-environment cluster delivery pipelines",
    long_about = None,
)]
struct Cli {
    /// Target account; overrides CDK_DEFAULT_ACCOUNT and the config file.
    #[arg(long, global = true)]
    account: Option<String>,

    /// Default region; overrides CDK_DEFAULT_REGION and the config file.
    #[arg(long, global = true)]
    region: Option<String>,

    /// Log debug output to stderr (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the reference pipeline configuration.
    Init(InitArgs),

    /// Load the configuration and assemble the pipeline without writing anything.
    Validate(ValidateArgs),

    /// Show the stages the pipeline would deploy.
    Plan(PlanArgs),

    /// Print the GitOps bootstrap descriptor for one environment.
    Bootstrap(BootstrapArgs),

    /// Render and write the pipeline manifests.
    Synth(SynthArgs),

    /// Show unified diff of what synth would write.
    Diff(DiffArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let env = env_logger::Env::default().default_filter_or(default);
    let _ = env_logger::Builder::from_env(env)
        .format_target(false)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = Settings::from_env().overridden_by(Settings {
        account: cli.account,
        region: cli.region,
    });
    log::debug!("settings: {settings:?}");

    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Validate(args) => args.run(&settings),
        Commands::Plan(args) => args.run(&settings),
        Commands::Bootstrap(args) => args.run(&settings),
        Commands::Synth(args) => args.run(&settings),
        Commands::Diff(args) => args.run(&settings),
    }
}
