//! Common test utilities.
//!
//! This module contains shared helpers for integration tests.
//! Import with `mod common;` in test files.

#![allow(dead_code)]

use chime::cluster::view::ClusterView;
use chime::core::time::ManualClock;
use chime::timer::entity::Timer;
use std::collections::HashMap;
use std::sync::Arc;

/// Fixed per-node bloom tokens matching the addressing fixtures: the first
/// two tokens OR to 0x0010011000011001.
pub const HASH_10_0_0_1: u64 = 0x0010_0000_0001_1001;
pub const HASH_10_0_0_2: u64 = 0x0000_0110_0001_0001;
pub const HASH_10_0_0_3: u64 = 0x0100_0000_1000_0110;

/// A three-node cluster view with pinned bloom tokens, local node
/// 10.0.0.1, bind port 9999.
pub fn fixture_view() -> ClusterView {
    fixture_view_local("10.0.0.1")
}

/// Same cluster as [`fixture_view`] seen from a chosen local node.
pub fn fixture_view_local(local: &str) -> ClusterView {
    let addresses = vec![
        "10.0.0.1".to_string(),
        "10.0.0.2".to_string(),
        "10.0.0.3".to_string(),
    ];
    let hashes: HashMap<String, u64> = [
        ("10.0.0.1".to_string(), HASH_10_0_0_1),
        ("10.0.0.2".to_string(), HASH_10_0_0_2),
        ("10.0.0.3".to_string(), HASH_10_0_0_3),
    ]
    .into_iter()
    .collect();

    ClusterView::with_hashes(local, addresses, hashes, 9999)
}

/// A clock pinned at an arbitrary but fixed wall time.
pub fn fixed_clock() -> Arc<ManualClock> {
    ManualClock::at(1_000_000)
}

/// A live timer in the style of the service's own fixtures: 100 ms
/// interval, single replica, known callback.
pub fn default_timer(id: u64) -> Timer {
    let clock = fixed_clock();
    let mut timer = Timer::new(id, 100, 100, clock.as_ref());
    timer.start_time = 1_000_000;
    timer.sequence_number = 0;
    timer.replicas = vec!["10.0.0.1".to_string()];
    timer.callback_url = format!("localhost:80/callback{id}");
    timer.callback_body = "stuff stuff stuff".to_string();
    timer
}

/// A minimal valid configuration document.
pub fn minimal_config_toml() -> &'static str {
    r#"
[cluster]
local_address = "10.0.0.1"
addresses = ["10.0.0.1", "10.0.0.2"]
bind_port = 9999
"#
}
