//! Wall-clock abstraction.
//!
//! The store and the timer entity never read the system clock directly;
//! they take a [`Clock`] so tests can drive the timing wheel
//! deterministically. Production code uses [`SystemClock`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall time in milliseconds since the Unix epoch.
///
/// Implementations must be cheap to call on the hot path; this is the only
/// system interaction the store performs per operation.
pub trait Clock: Send + Sync {
    /// Current wall time in milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;
}

/// Production clock backed by `SystemTime`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        // A system clock reading before 1970 means the host cannot tell
        // wall time at all; the timer service cannot run without it.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock reads before the Unix epoch; timer service cannot run")
            .as_millis() as u64
    }
}

/// Manually-advanced clock for tests.
///
/// Shared via `Arc` so the store and the test body observe the same time.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    /// Create a clock pinned at the given millisecond timestamp.
    pub fn at(now_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            now_ms: AtomicU64::new(now_ms),
        })
    }

    /// Advance the clock by the given number of milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }

    /// Pin the clock to an absolute millisecond timestamp.
    pub fn set_ms(&self, ms: u64) {
        self.now_ms.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}
