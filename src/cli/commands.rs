//! CLI command implementations.

use crate::cluster::view::ClusterView;
use crate::core::config::{Config, ConfigOverrides};
use crate::core::runtime::Runtime;
use crate::dispatch::dispatcher::{CallbackSink, ReplicationSink};
use crate::timer::codec;
use crate::timer::entity::Timer;
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::Path;
use std::sync::Arc;

/// Arguments for `chime start`.
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Override the bind port.
    #[arg(long)]
    pub bind_port: Option<u16>,

    /// Override the local cluster address.
    #[arg(long)]
    pub local_address: Option<String>,
}

/// Arguments for `chime config`.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Parse and validate a configuration file.
    Validate,
}

/// Arguments for `chime status`.
#[derive(Args, Debug)]
pub struct StatusArgs {}

/// Stand-in callback sink until an HTTP delivery transport is wired in:
/// pops are logged, not delivered.
struct LoggingCallbackSink;

impl CallbackSink for LoggingCallbackSink {
    fn fire(&self, timer: &Timer) -> bool {
        tracing::info!(
            id = timer.id,
            callback_url = %timer.callback_url,
            sequence = timer.sequence_number,
            "timer popped"
        );
        true
    }
}

/// Stand-in replication sink: renders the wire body into the log instead
/// of pushing it to peers.
struct LoggingReplicationSink;

impl ReplicationSink for LoggingReplicationSink {
    fn replicate(&self, timer: &Timer) {
        tracing::info!(
            id = timer.id,
            replicas = ?timer.replicas,
            extra_replicas = ?timer.extra_replicas,
            body = %codec::encode(timer),
            "would replicate timer"
        );
    }
}

/// Run `chime start`.
pub async fn run_start(
    config_path: &Path,
    args: StartArgs,
    log_level: Option<String>,
) -> Result<()> {
    let mut config = Config::from_file(config_path)?;
    config.apply_overrides(&ConfigOverrides {
        log_level,
        bind_port: args.bind_port,
        local_address: args.local_address,
    });
    config.validate()?;

    init_tracing(&config)?;
    tracing::warn!("no delivery transport configured; callbacks will be logged only");

    let mut runtime = Runtime::new(
        config,
        Arc::new(LoggingCallbackSink),
        Arc::new(LoggingReplicationSink),
    )?;
    runtime.start();

    tokio::signal::ctrl_c()
        .await
        .context("failed to wait for interrupt signal")?;

    runtime.shutdown();
    tracing::info!(stats = %runtime.stats().to_text(), "chime stopped");
    Ok(())
}

/// Run `chime config <subcommand>`.
pub fn run_config(config_path: &Path, args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Validate => {
            let config = Config::from_file(config_path)?;
            println!(
                "ok: {} nodes, local {}, port {}",
                config.cluster.addresses.len(),
                config.cluster.local_address,
                config.cluster.bind_port
            );
            Ok(())
        }
    }
}

/// Run `chime status`: render the effective configuration and the cluster
/// snapshot this node derives from it.
pub fn run_status(config_path: &Path, _args: StatusArgs) -> Result<()> {
    let config = Config::from_file(config_path)?;
    let view = ClusterView::from_config(&config);

    println!("config: {}", config_path.display());
    println!("  deployment_id:        {}", config.identity.deployment_id);
    println!("  instance_id:          {}", config.identity.instance_id);
    println!(
        "  dispatch_interval_ms: {}",
        config.timers.dispatch_interval_ms
    );
    println!("  log_level:            {}", config.telemetry.log_level);

    println!("cluster:");
    println!("  local address: {}", view.local_address());
    println!("  bind port:     {}", view.bind_port());
    println!("  nodes:");
    for address in view.addresses() {
        let marker = if address == view.local_address() {
            " (local)"
        } else {
            ""
        };
        println!(
            "    {address}  token={:#018x}{marker}",
            view.hash_of(address)
        );
    }
    Ok(())
}

fn init_tracing(config: &Config) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_new(&config.telemetry.log_level)
        .context("invalid log level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}
