//! The timer entity.
//!
//! A [`Timer`] carries its identity, timing, HTTP callback, and the set of
//! cluster nodes that replicate it. A timer with both callback fields empty
//! is a *tombstone*: it occupies the same id and schedule as the timer it
//! replaces, and exists only to suppress stale pops on replicas that have
//! not yet heard about a delete or a completed run.
//!
//! Replica placement is deterministic: any node can recompute a timer's
//! replica set from its id and the shared cluster view, which is what makes
//! the timer URL an opaque, self-contained handle.

use crate::cluster::view::ClusterView;
use crate::core::error::{ChimeError, ChimeResult};
use crate::core::time::Clock;
use std::io::Cursor;

/// Unique timer identity.
pub type TimerId = u64;

/// Stagger between successive replicas' pop attempts, in milliseconds.
///
/// Replica 0 pops at time t, replica 1 at t + 2 s, and so on. A secondary
/// only fires if the primary's tombstone has not arrived by then.
pub const REPLICA_STAGGER_MS: u64 = 2_000;

/// Lifetime of a tombstone created for a delete of an unknown timer.
pub const DEFAULT_TOMBSTONE_TTL_MS: u64 = 10_000;

/// A timer owned or replicated by this node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timer {
    /// 64-bit identity, unique across the geo-redundant cluster.
    pub id: TimerId,

    /// Wall time (ms since epoch) at which the first pop is anchored.
    pub start_time: u64,

    /// Milliseconds between consecutive pops.
    pub interval: u64,

    /// Total duration over which the timer pops, in milliseconds.
    pub repeat_for: u64,

    /// Pops already performed; increments after each pop.
    pub sequence_number: u32,

    /// Ordered cluster addresses designated to own this timer.
    pub replicas: Vec<String>,

    /// Addresses hinted by an incoming URL's bloom filter but not chosen by
    /// deterministic placement; tombstones must still reach them.
    pub extra_replicas: Vec<String>,

    /// Callback target; empty together with `callback_body` marks a
    /// tombstone.
    pub callback_url: String,

    /// Opaque payload delivered in the callback body.
    pub callback_body: String,

    /// Desired replica count; may differ from `replicas.len()` until the
    /// replica set has been derived.
    pub replication_factor: u32,
}

impl Timer {
    /// Create a timer anchored at the current wall time.
    pub fn new(id: TimerId, interval_ms: u64, repeat_for_ms: u64, clock: &dyn Clock) -> Self {
        Self {
            id,
            start_time: clock.now_ms(),
            interval: interval_ms,
            repeat_for: repeat_for_ms,
            sequence_number: 0,
            replicas: Vec::new(),
            extra_replicas: Vec::new(),
            callback_url: String::new(),
            callback_body: String::new(),
            replication_factor: 0,
        }
    }

    /// Create a tombstone for a delete of a timer this node has never seen.
    ///
    /// The tombstone lives for ten seconds; if it lands on top of an
    /// existing timer the store stretches it to that timer's interval
    /// instead.
    pub fn create_tombstone(
        id: TimerId,
        replica_hash: u64,
        view: &ClusterView,
        clock: &dyn Clock,
    ) -> ChimeResult<Self> {
        let mut tombstone = Self::new(
            id,
            DEFAULT_TOMBSTONE_TTL_MS,
            DEFAULT_TOMBSTONE_TTL_MS,
            clock,
        );
        tombstone.calculate_replicas(view, replica_hash)?;
        Ok(tombstone)
    }

    /// The next wall time (ms) at which this node should pop the timer.
    ///
    /// Each replica defers by [`REPLICA_STAGGER_MS`] per position, so a
    /// secondary's attempt only matters if the primary failed to fire and
    /// tombstone in time. A node absent from the replica set behaves as the
    /// primary.
    pub fn next_pop_time(&self, view: &ClusterView) -> u64 {
        let replica_index = self
            .replicas
            .iter()
            .position(|r| r == view.local_address())
            .unwrap_or(0) as u64;

        self.start_time
            + (u64::from(self.sequence_number) + 1) * self.interval
            + replica_index * REPLICA_STAGGER_MS
    }

    /// Render this timer's opaque URL for the given externally-visible host.
    ///
    /// The path packs the id and the OR of the replicas' bloom tokens as
    /// two zero-padded 16-digit hex fields, so any node that later receives
    /// the URL can recover both without a lookup.
    pub fn url(&self, view: &ClusterView, host: &str) -> String {
        let replica_hash = view.combined_hash(&self.replicas);
        format!(
            "http://{}:{}/timers/{:016x}{:016x}",
            host,
            view.bind_port(),
            self.id,
            replica_hash
        )
    }

    /// Check whether the given address holds a replica of this timer.
    pub fn is_local(&self, address: &str) -> bool {
        self.replicas.iter().any(|r| r == address)
    }

    /// A timer with empty callback fields is a tombstone.
    pub fn is_tombstone(&self) -> bool {
        self.callback_url.is_empty() && self.callback_body.is_empty()
    }

    /// Turn this timer into a tombstone in place.
    ///
    /// The start time is left alone, so the repeat-for window is stretched
    /// to cover every pop the original had scheduled; replicas that still
    /// hold the live timer will receive the tombstone before their own
    /// staggered attempt.
    pub fn become_tombstone(&mut self) {
        self.callback_url.clear();
        self.callback_body.clear();
        self.repeat_for = self.interval * (u64::from(self.sequence_number) + 1);
    }

    /// True while pops remain within the repeat-for window.
    pub fn has_remaining_pops(&self) -> bool {
        u64::from(self.sequence_number) * self.interval <= self.repeat_for
    }

    /// Precedence between two timers with the same id: larger start time
    /// wins, then larger sequence number.
    pub fn supersedes(&self, other: &Timer) -> bool {
        (self.start_time, self.sequence_number) > (other.start_time, other.sequence_number)
    }

    /// Derive the replica set from the cluster view and an optional bloom
    /// hash taken from an incoming timer URL.
    ///
    /// Placement always starts at `murmur3(id) % cluster.size` and walks
    /// the shared address order, so every node derives the same set. When a
    /// bloom hash is present its members that placement did not pick are
    /// remembered as extra replicas: they are likely owners from an older
    /// topology and must still receive tombstones.
    pub fn calculate_replicas(
        &mut self,
        view: &ClusterView,
        replica_hash: u64,
    ) -> ChimeResult<()> {
        if view.size() == 0 {
            return Err(ChimeError::EmptyCluster);
        }

        self.replicas.clear();
        self.extra_replicas.clear();

        if replica_hash != 0 {
            let hash_replicas = view.bloom_members(replica_hash);

            // The bloom members stand in for the replication factor when
            // the request did not carry one.
            if self.replication_factor == 0 {
                self.replication_factor = hash_replicas.len() as u32;
            }

            self.pick_replicas(view);

            self.extra_replicas = hash_replicas
                .into_iter()
                .filter(|a| !self.replicas.contains(a))
                .collect();
        } else {
            self.pick_replicas(view);
        }

        tracing::debug!(
            id = self.id,
            replicas = ?self.replicas,
            extra = ?self.extra_replicas,
            "replicas calculated"
        );

        Ok(())
    }

    fn pick_replicas(&mut self, view: &ClusterView) {
        let first = id_placement_hash(self.id) as usize % view.size();
        let count = (self.replication_factor as usize).min(view.size());

        for offset in 0..count {
            let addr = &view.addresses()[(first + offset) % view.size()];
            self.replicas.push(addr.clone());
        }
    }
}

/// Hash a timer id for placement.
///
/// Every node must agree on this value, so the algorithm is part of the
/// addressing contract: murmur3 x86 32-bit over the id's little-endian
/// bytes with a zero seed.
fn id_placement_hash(id: TimerId) -> u32 {
    // Reading from an in-memory cursor cannot fail.
    murmur3::murmur3_32(&mut Cursor::new(id.to_le_bytes()), 0).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::ManualClock;

    fn view() -> ClusterView {
        ClusterView::new(
            "10.0.0.2",
            vec![
                "10.0.0.1".to_string(),
                "10.0.0.2".to_string(),
                "10.0.0.3".to_string(),
            ],
            7253,
        )
    }

    #[test]
    fn stagger_offsets_by_replica_position() {
        let clock = ManualClock::at(0);
        let mut timer = Timer::new(1, 500, 1_000, clock.as_ref());
        timer.start_time = 1_000;
        timer.replicas = vec![
            "10.0.0.1".to_string(),
            "10.0.0.2".to_string(),
            "10.0.0.3".to_string(),
        ];

        // Local node 10.0.0.2 sits at replica index 1.
        assert_eq!(timer.next_pop_time(&view()), 1_000 + 500 + 2_000);
    }

    #[test]
    fn missing_local_address_pops_as_primary() {
        let clock = ManualClock::at(0);
        let mut timer = Timer::new(1, 500, 1_000, clock.as_ref());
        timer.start_time = 1_000;
        timer.replicas = vec!["10.0.0.1".to_string(), "10.0.0.3".to_string()];

        assert_eq!(timer.next_pop_time(&view()), 1_500);
    }

    #[test]
    fn placement_is_deterministic_and_wraps() {
        let v = view();
        let clock = ManualClock::at(0);

        let mut a = Timer::new(77, 1_000, 1_000, clock.as_ref());
        a.replication_factor = 2;
        a.calculate_replicas(&v, 0).unwrap();

        let mut b = Timer::new(77, 1_000, 1_000, clock.as_ref());
        b.replication_factor = 2;
        b.calculate_replicas(&v, 0).unwrap();

        assert_eq!(a.replicas, b.replicas);
        assert_eq!(a.replicas.len(), 2);
        // Both picks are cluster members and distinct.
        assert!(v.contains(&a.replicas[0]));
        assert!(v.contains(&a.replicas[1]));
        assert_ne!(a.replicas[0], a.replicas[1]);
    }

    #[test]
    fn replication_factor_is_capped_by_cluster_size() {
        let v = view();
        let clock = ManualClock::at(0);
        let mut timer = Timer::new(5, 1_000, 1_000, clock.as_ref());
        timer.replication_factor = 10;
        timer.calculate_replicas(&v, 0).unwrap();
        assert_eq!(timer.replicas.len(), 3);
    }

    #[test]
    fn empty_cluster_is_rejected() {
        let empty = ClusterView::new("x", Vec::new(), 7253);
        let clock = ManualClock::at(0);
        let mut timer = Timer::new(5, 1_000, 1_000, clock.as_ref());
        timer.replication_factor = 2;
        assert!(matches!(
            timer.calculate_replicas(&empty, 0),
            Err(ChimeError::EmptyCluster)
        ));
    }
}
