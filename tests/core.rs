//! Core infrastructure tests.

mod common;

use chime::core::config::{Config, ConfigOverrides};
use chime::core::error::ChimeError;
use std::io::Write;
use tempfile::NamedTempFile;

// ============================================================================
// Config tests
// ============================================================================

#[test]
fn parse_minimal_config() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(common::minimal_config_toml().as_bytes())
        .unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.cluster.local_address, "10.0.0.1");
    assert_eq!(config.cluster.addresses.len(), 2);
    assert_eq!(config.cluster.bind_port, 9999);

    // Defaults kick in for omitted sections.
    assert_eq!(config.identity.deployment_id, 0);
    assert_eq!(config.timers.dispatch_interval_ms, 10);
    assert_eq!(config.telemetry.log_level, "info");
}

#[test]
fn parse_full_config() {
    let config_content = r#"
[cluster]
local_address = "10.0.0.2"
addresses = ["10.0.0.1", "10.0.0.2", "10.0.0.3"]
bind_port = 7253

[identity]
deployment_id = 2
instance_id = 17

[timers]
dispatch_interval_ms = 20

[telemetry]
log_level = "debug"
"#;

    let config = Config::from_toml(config_content).unwrap();
    assert_eq!(config.cluster.addresses.len(), 3);
    assert_eq!(config.identity.deployment_id, 2);
    assert_eq!(config.identity.instance_id, 17);
    assert_eq!(config.timers.dispatch_interval_ms, 20);
    assert_eq!(config.telemetry.log_level, "debug");
}

#[test]
fn validate_rejects_empty_cluster() {
    let config_content = r#"
[cluster]
local_address = "10.0.0.1"
addresses = []
"#;

    let result = Config::from_toml(config_content);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("addresses"));
}

#[test]
fn validate_rejects_foreign_local_address() {
    let config_content = r#"
[cluster]
local_address = "192.168.0.9"
addresses = ["10.0.0.1", "10.0.0.2"]
"#;

    let result = Config::from_toml(config_content);
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("local_address"));
}

#[test]
fn validate_rejects_identity_out_of_range() {
    let config_content = r#"
[cluster]
local_address = "10.0.0.1"
addresses = ["10.0.0.1"]

[identity]
deployment_id = 8
"#;

    let result = Config::from_toml(config_content);
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("deployment_id"));
}

#[test]
fn validate_rejects_zero_dispatch_interval() {
    let config_content = r#"
[cluster]
local_address = "10.0.0.1"
addresses = ["10.0.0.1"]

[timers]
dispatch_interval_ms = 0
"#;

    let result = Config::from_toml(config_content);
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("dispatch_interval_ms"));
}

#[test]
fn validate_rejects_unknown_log_level() {
    let config_content = r#"
[cluster]
local_address = "10.0.0.1"
addresses = ["10.0.0.1"]

[telemetry]
log_level = "verbose"
"#;

    let result = Config::from_toml(config_content);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("log_level"));
}

#[test]
fn overrides_apply_on_top_of_file() {
    let mut config = Config::from_toml(common::minimal_config_toml()).unwrap();
    config.apply_overrides(&ConfigOverrides {
        log_level: Some("warn".to_string()),
        bind_port: Some(8888),
        local_address: Some("10.0.0.2".to_string()),
    });

    assert_eq!(config.telemetry.log_level, "warn");
    assert_eq!(config.cluster.bind_port, 8888);
    assert_eq!(config.cluster.local_address, "10.0.0.2");
    config.validate().unwrap();
}

#[test]
fn missing_config_file_reports_path() {
    let result = Config::from_file(std::path::Path::new("/nonexistent/chime.toml"));
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("/nonexistent/chime.toml"));
}

// ============================================================================
// Error tests
// ============================================================================

#[test]
fn decode_errors_name_the_field() {
    let err = ChimeError::decode("'repeat-for' should be an integer");
    assert!(err.to_string().contains("'repeat-for'"));
}

#[test]
fn invalid_url_errors_echo_the_path() {
    let err = ChimeError::invalid_url("/timers/bogus");
    assert!(err.to_string().contains("/timers/bogus"));
    assert!(err.is_client_error());
}
