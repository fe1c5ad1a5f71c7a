//! Configuration parsing and validation.
//!
//! Chime configuration is loaded from TOML files with CLI overrides. The
//! cluster section must list the same addresses in the same order on every
//! node: replica placement walks that shared ordering.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level Chime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Cluster membership and addressing.
    pub cluster: ClusterConfig,

    /// Process identity for id generation.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Timer behaviour defaults.
    #[serde(default)]
    pub timers: TimersConfig,

    /// Telemetry and logging configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Cluster membership configuration.
///
/// `addresses` must be identical (content and order) across the cluster;
/// every node derives the same replica sets from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// This node's address as it appears in `addresses`.
    pub local_address: String,

    /// Ordered list of all cluster node addresses.
    pub addresses: Vec<String>,

    /// Port the timer HTTP interface binds to; also the port baked into
    /// timer URLs handed back to clients.
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,
}

/// Process identity used to keep generated timer ids unique across a
/// geo-redundant deployment without coordination.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Deployment (site) identifier, 0..=7.
    #[serde(default)]
    pub deployment_id: u32,

    /// Instance identifier within the deployment, 0..=127.
    #[serde(default)]
    pub instance_id: u32,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            deployment_id: 0,
            instance_id: 0,
        }
    }
}

/// Timer behaviour defaults.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimersConfig {
    /// Dispatcher wake interval in milliseconds; the pop resolution.
    #[serde(default = "default_dispatch_interval_ms")]
    pub dispatch_interval_ms: u64,
}

impl Default for TimersConfig {
    fn default() -> Self {
        Self {
            dispatch_interval_ms: default_dispatch_interval_ms(),
        }
    }
}

/// Telemetry and logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// Default value functions

fn default_bind_port() -> u16 {
    7253
}

fn default_dispatch_interval_ms() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| "failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).with_context(|| "failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI overrides to the configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref log_level) = overrides.log_level {
            self.telemetry.log_level = log_level.clone();
        }
        if let Some(bind_port) = overrides.bind_port {
            self.cluster.bind_port = bind_port;
        }
        if let Some(ref local_address) = overrides.local_address {
            self.cluster.local_address = local_address.clone();
        }
    }

    /// Validate configuration consistency.
    pub fn validate(&self) -> Result<()> {
        self.validate_cluster()?;
        self.validate_identity()?;
        self.validate_timers()?;
        self.validate_telemetry()?;
        Ok(())
    }

    fn validate_cluster(&self) -> Result<()> {
        if self.cluster.addresses.is_empty() {
            anyhow::bail!("cluster.addresses must list at least one node");
        }

        if !self
            .cluster
            .addresses
            .iter()
            .any(|a| a == &self.cluster.local_address)
        {
            anyhow::bail!(
                "cluster.local_address '{}' is not listed in cluster.addresses",
                self.cluster.local_address
            );
        }

        if self.cluster.bind_port == 0 {
            anyhow::bail!("cluster.bind_port must be > 0");
        }

        Ok(())
    }

    fn validate_identity(&self) -> Result<()> {
        if self.identity.deployment_id > 7 {
            anyhow::bail!(
                "identity.deployment_id must be 0..=7, got: {}",
                self.identity.deployment_id
            );
        }
        if self.identity.instance_id > 127 {
            anyhow::bail!(
                "identity.instance_id must be 0..=127, got: {}",
                self.identity.instance_id
            );
        }
        Ok(())
    }

    fn validate_timers(&self) -> Result<()> {
        if self.timers.dispatch_interval_ms == 0 {
            anyhow::bail!("timers.dispatch_interval_ms must be > 0");
        }
        Ok(())
    }

    fn validate_telemetry(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.telemetry.log_level.as_str()) {
            anyhow::bail!(
                "telemetry.log_level must be one of {:?}, got: {}",
                valid_levels,
                self.telemetry.log_level
            );
        }
        Ok(())
    }
}

/// CLI override options that can be applied to configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override log level.
    pub log_level: Option<String>,
    /// Override the bind port.
    pub bind_port: Option<u16>,
    /// Override the local cluster address.
    pub local_address: Option<String>,
}
