//! Cluster-unique timer id generation.
//!
//! Timer ids must stay unique across a geo-redundant deployment for the
//! lifetime of the timer, without any coordination. Each id packs the
//! wall-clock millisecond, the deployment and instance identity, and an
//! intra-millisecond sequence:
//!
//! ```text
//! 63                    24 23  21 20      14 13         0
//! +-----------------------+------+----------+-----------+
//! | timestamp ms, 40 bits | depl | instance | sequence  |
//! +-----------------------+------+----------+-----------+
//! ```
//!
//! The timestamp keeps its low 40 bits and wraps every ~35 years; ids only
//! need to stay unique for the lifetime of their timers.
//!
//! Concurrent calls on one process are disambiguated by an atomic
//! max-and-increment: each generated id is the larger of the timestamped
//! candidate and `previous + 1`, so ids are strictly distinct and
//! non-decreasing regardless of call rate.

use crate::core::config::IdentityConfig;
use crate::core::time::Clock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const DEPLOYMENT_SHIFT: u32 = 21;
const INSTANCE_SHIFT: u32 = 14;
const TIMESTAMP_SHIFT: u32 = 24;
const TIMESTAMP_MASK: u64 = (1 << 40) - 1;

/// Generator of cluster-unique 64-bit timer ids.
pub struct IdGenerator {
    deployment_id: u64,
    instance_id: u64,
    clock: Arc<dyn Clock>,
    last: AtomicU64,
}

impl IdGenerator {
    /// Create a generator for this process's identity.
    pub fn new(identity: IdentityConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            deployment_id: u64::from(identity.deployment_id & 0x7),
            instance_id: u64::from(identity.instance_id & 0x7f),
            clock,
            last: AtomicU64::new(0),
        }
    }

    /// Generate the next id.
    ///
    /// Distinct across concurrent callers and non-decreasing over time
    /// within this process; the identity bits keep ids from different
    /// processes apart.
    pub fn next(&self) -> u64 {
        let candidate = self.candidate(self.clock.now_ms());

        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let next = candidate.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(observed) => prev = observed,
            }
        }
    }

    fn candidate(&self, now_ms: u64) -> u64 {
        ((now_ms & TIMESTAMP_MASK) << TIMESTAMP_SHIFT)
            | (self.deployment_id << DEPLOYMENT_SHIFT)
            | (self.instance_id << INSTANCE_SHIFT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::{ManualClock, SystemClock};

    fn generator() -> IdGenerator {
        IdGenerator::new(
            IdentityConfig {
                deployment_id: 3,
                instance_id: 42,
            },
            Arc::new(SystemClock),
        )
    }

    #[test]
    fn ids_are_strictly_increasing() {
        let gen = generator();
        let mut prev = gen.next();
        for _ in 0..10_000 {
            let id = gen.next();
            assert!(id > prev);
            prev = id;
        }
    }

    #[test]
    fn identity_bits_are_packed() {
        let clock = ManualClock::at(1_000);
        let gen = IdGenerator::new(
            IdentityConfig {
                deployment_id: 3,
                instance_id: 42,
            },
            clock,
        );
        let id = gen.next();
        assert_eq!((id >> TIMESTAMP_SHIFT), 1_000);
        assert_eq!((id >> DEPLOYMENT_SHIFT) & 0x7, 3);
        assert_eq!((id >> INSTANCE_SHIFT) & 0x7f, 42);
    }

    #[test]
    fn stalled_clock_still_yields_distinct_ids() {
        let clock = ManualClock::at(5_000);
        let gen = IdGenerator::new(IdentityConfig::default(), clock);
        let a = gen.next();
        let b = gen.next();
        let c = gen.next();
        assert!(a < b && b < c);
    }
}
