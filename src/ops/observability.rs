//! Service statistics and health reporting.
//!
//! The overflow-heap depth is the number to watch: timers only land there
//! when they fall past the second wheel, and a persistently non-zero depth
//! means the wheel is undersized for the workload rather than a transient
//! burst.

use crate::dispatch::dispatcher::DispatchStats;
use crate::store::timer_store::StoreStats;

/// Aggregate statistics across the store and the dispatch loop.
#[derive(Debug, Clone, Copy)]
pub struct ServiceStats {
    /// Timer store statistics.
    pub store: StoreStats,
    /// Dispatch loop counters.
    pub dispatch: DispatchStats,
}

impl ServiceStats {
    /// Render a plain-text report suitable for a status endpoint or log
    /// line.
    pub fn to_text(&self) -> String {
        format!(
            "timers={} ms_wheel={} s_wheel={} heap_depth={} \
             batches={} fired={} failed={} tombstoned={}",
            self.store.total_timers,
            self.store.ms_wheel_timers,
            self.store.s_wheel_timers,
            self.store.heap_depth,
            self.dispatch.batches,
            self.dispatch.fired,
            self.dispatch.failed,
            self.dispatch.tombstoned,
        )
    }

    /// True when the overflow heap is in use.
    pub fn heap_in_use(&self) -> bool {
        self.store.heap_depth > 0
    }
}

/// Health check result.
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Overall healthy state.
    pub healthy: bool,
    /// Status message.
    pub message: String,
}

impl HealthStatus {
    /// A healthy status.
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            message: "ok".to_string(),
        }
    }

    /// An unhealthy status with a reason.
    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            healthy: false,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_report_contains_heap_depth() {
        let stats = ServiceStats {
            store: StoreStats {
                total_timers: 3,
                ms_wheel_timers: 1,
                s_wheel_timers: 1,
                heap_depth: 1,
                first_bucket_timestamp: 0,
            },
            dispatch: DispatchStats {
                batches: 2,
                fired: 5,
                failed: 1,
                tombstoned: 1,
            },
        };
        let text = stats.to_text();
        assert!(text.contains("heap_depth=1"));
        assert!(stats.heap_in_use());
    }
}
