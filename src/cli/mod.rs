//! Command-line interface.
//!
//! Unified CLI for Chime operations.

pub mod commands;

use clap::{Parser, Subcommand};

/// Chime - distributed, replicated timer service.
#[derive(Parser, Debug)]
#[command(name = "chime")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path.
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the Chime node.
    Start(commands::StartArgs),
    /// Configuration operations.
    Config(commands::ConfigArgs),
    /// Show the effective configuration and derived cluster snapshot.
    Status(commands::StatusArgs),
}
