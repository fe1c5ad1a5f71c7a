//! Chime - unified CLI entrypoint.
//!
//! Usage:
//!   chime start --config config/chime.toml
//!   chime config validate --config config/chime.toml
//!   chime status --config config/chime.toml

use anyhow::Result;
use chime::cli::commands::{run_config, run_start, run_status};
use chime::cli::{Cli, Commands};
use clap::Parser;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Determine config path - use global --config or default
    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config/chime.toml"));

    match cli.command {
        Commands::Start(args) => run_start(&config_path, args, cli.log_level).await,
        Commands::Config(args) => run_config(&config_path, args),
        Commands::Status(args) => run_status(&config_path, args),
    }
}
