//! Scrollstage CLI
//!
//! Replay page scenarios against the headless document and print what the
//! stage ended up doing.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod scenario;

use scenario::Scenario;
use scrollstage_core::StageConfig;

#[derive(Parser)]
#[command(name = "scrollstage")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Page transitions and scroll stacking, headless", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and print the final report as JSON
    Run {
        /// Scenario file (TOML)
        scenario: PathBuf,

        /// Pretty-print the report
        #[arg(short, long)]
        pretty: bool,
    },

    /// Parse and validate a scenario without running it
    Check {
        /// Scenario file (TOML)
        scenario: PathBuf,
    },

    /// Print the default stage configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so the report can be piped
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Run { scenario, pretty } => cmd_run(&scenario, pretty),
        Commands::Check { scenario } => cmd_check(&scenario),
        Commands::Config => cmd_config(),
    }
}

fn cmd_run(path: &Path, pretty: bool) -> Result<()> {
    let scenario = Scenario::load(path)?;
    let report = scenario.run()?;

    let json = if pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .context("Failed to serialize report")?;
    println!("{json}");
    Ok(())
}

fn cmd_check(path: &Path) -> Result<()> {
    let scenario = Scenario::load(path)?;
    info!(
        "{} is valid: {} events, {} navigation targets",
        path.display(),
        scenario.events.len(),
        scenario.pages.len()
    );
    Ok(())
}

fn cmd_config() -> Result<()> {
    let config = toml::to_string_pretty(&StageConfig::default())
        .context("Failed to serialize default config")?;
    print!("{config}");
    Ok(())
}
