mod commands;
mod render;

use std::path::PathBuf;

use anyhow::{Context, Result};
use calmirror_core::MirrorConfig;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "calmirror")]
#[command(about = "Mirror your primary calendar onto the calendars enrolled for it")]
struct Cli {
    /// Config file to use instead of ~/.config/calmirror/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show every replication and debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replicate changes made since the last run (meant to be run by a scheduler)
    Sync {
        /// Calendar that triggered the run. Anything but the primary is a no-op.
        #[arg(short, long)]
        calendar: Option<String>,
    },
    /// Delete all copies and sync state, then copy recent events again
    Reset,
    /// Show the stored sync state
    Status,
    /// List calendars and whether they receive copies
    Calendars,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Sync { calendar } => commands::sync::run(&config, calendar, cli.verbose).await,
        Commands::Reset => commands::reset::run(&config, cli.verbose).await,
        Commands::Status => commands::status::run(&config),
        Commands::Calendars => commands::calendars::run(&config).await,
    }
}

/// Log to stderr so stdout only carries the report. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&std::path::Path>) -> Result<MirrorConfig> {
    match path {
        Some(path) => MirrorConfig::load_from(path)
            .with_context(|| format!("Could not load config from {}", path.display())),
        None => MirrorConfig::load().context("Could not load config"),
    }
}
