//! Read-only cluster snapshot.
//!
//! A [`ClusterView`] is an immutable picture of the cluster taken at
//! startup: the local node's address, the shared ordered address list, a
//! 64-bit bloom token per node, and the bind port. Replica placement and
//! URL encoding both work purely off this snapshot, so any node can
//! reconstruct a timer's replica set without talking to its peers.

use crate::core::config::Config;
use std::collections::HashMap;
use std::hash::Hasher;
use std::sync::Arc;
use twox_hash::XxHash64;

/// Seed for bloom-token derivation; shared by every node so tokens agree
/// cluster-wide.
const TOKEN_SEED: u64 = 0x6368_696d_6500;

/// Immutable snapshot of cluster membership.
///
/// Cheap to clone (shared internals) and safe to read from any thread.
#[derive(Debug, Clone)]
pub struct ClusterView {
    inner: Arc<ViewInner>,
}

#[derive(Debug)]
struct ViewInner {
    local_address: String,
    addresses: Vec<String>,
    hashes: HashMap<String, u64>,
    bind_port: u16,
}

impl ClusterView {
    /// Create a view deriving each node's bloom token from its address.
    pub fn new(
        local_address: impl Into<String>,
        addresses: Vec<String>,
        bind_port: u16,
    ) -> Self {
        let hashes = addresses
            .iter()
            .map(|a| (a.clone(), bloom_token(a)))
            .collect();
        Self {
            inner: Arc::new(ViewInner {
                local_address: local_address.into(),
                addresses,
                hashes,
                bind_port,
            }),
        }
    }

    /// Create a view with explicit per-node bloom tokens.
    ///
    /// Used by tests and by operators that pin tokens across topology
    /// changes; `hashes` must cover every address.
    pub fn with_hashes(
        local_address: impl Into<String>,
        addresses: Vec<String>,
        hashes: HashMap<String, u64>,
        bind_port: u16,
    ) -> Self {
        Self {
            inner: Arc::new(ViewInner {
                local_address: local_address.into(),
                addresses,
                hashes,
                bind_port,
            }),
        }
    }

    /// Build the production snapshot from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.cluster.local_address.clone(),
            config.cluster.addresses.clone(),
            config.cluster.bind_port,
        )
    }

    /// This node's address.
    pub fn local_address(&self) -> &str {
        &self.inner.local_address
    }

    /// All cluster node addresses, in the shared stable order.
    pub fn addresses(&self) -> &[String] {
        &self.inner.addresses
    }

    /// Number of nodes in the cluster.
    pub fn size(&self) -> usize {
        self.inner.addresses.len()
    }

    /// Check whether an address is a cluster member.
    pub fn contains(&self, address: &str) -> bool {
        self.inner.addresses.iter().any(|a| a == address)
    }

    /// The bloom token for a node, or 0 for unknown addresses.
    pub fn hash_of(&self, address: &str) -> u64 {
        self.inner.hashes.get(address).copied().unwrap_or(0)
    }

    /// Bitwise OR of the bloom tokens for the given addresses.
    pub fn combined_hash<'a>(&self, addresses: impl IntoIterator<Item = &'a String>) -> u64 {
        addresses
            .into_iter()
            .fold(0u64, |acc, a| acc | self.hash_of(a))
    }

    /// Addresses whose token collides with the given bloom filter, i.e.
    /// `(filter & token) == token`. Over-approximates the original set.
    pub fn bloom_members(&self, filter: u64) -> Vec<String> {
        self.inner
            .addresses
            .iter()
            .filter(|a| {
                let token = self.hash_of(a);
                token != 0 && (filter & token) == token
            })
            .cloned()
            .collect()
    }

    /// Port baked into timer URLs.
    pub fn bind_port(&self) -> u16 {
        self.inner.bind_port
    }
}

/// Derive a node's bloom token from its address.
///
/// Tokens keep a low Hamming weight (at most two set bits) so that
/// membership tests against an OR-combined filter stay tight: a filter of a
/// few nodes only rarely covers a token it did not include.
fn bloom_token(address: &str) -> u64 {
    let mut hasher = XxHash64::with_seed(TOKEN_SEED);
    hasher.write(address.as_bytes());
    let h = hasher.finish();

    let first = h % 64;
    let second = (h >> 16) % 64;
    (1u64 << first) | (1u64 << second)
}
