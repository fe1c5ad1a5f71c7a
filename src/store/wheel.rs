//! Timing-wheel geometry.
//!
//! The store covers time with two wheels and an overflow heap:
//!
//! - 100 buckets of 10 ms each cover the first second;
//! - 3600 buckets of 1 s each cover the following hour, offset by one
//!   second because the millisecond wheel owns the first;
//! - anything past the horizon waits in a min-heap keyed by pop time.
//!
//! [`locate`] maps a pop delta (milliseconds from the wheel's reference
//! timestamp) to a location. Second-bucket offsets returned here are
//! logical, relative to the store's second cursor; the store maps them to
//! physical slots so the offset-to-pop relationship stays true as the
//! reference timestamp advances.

/// Number of millisecond buckets; together they cover one second.
pub const MS_BUCKET_COUNT: usize = 100;

/// Width of one millisecond bucket.
pub const MS_BUCKET_SPAN_MS: u64 = 10;

/// Number of second buckets. Governs memory versus overflow-heap traffic;
/// the default gives a one-hour fast path.
pub const SECOND_BUCKET_COUNT: usize = 3600;

/// Furthest future delta the wheels cover, in milliseconds.
pub const WHEEL_HORIZON_MS: u64 = SECOND_BUCKET_COUNT as u64 * 1_000;

/// Where a timer with a given pop delta belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// Millisecond bucket index, 0..100.
    Ms(usize),

    /// Logical second-bucket offset from the second cursor, 0..3599.
    Second(usize),

    /// Past the second wheel; belongs in the overflow heap.
    BeyondHorizon,
}

/// Map a pop delta to its wheel location.
///
/// The delta is `next_pop_time - first_bucket_timestamp`, clamped to zero
/// by the caller for overdue timers (which therefore land in millisecond
/// bucket 0 and pop at the next opportunity).
pub fn locate(delta_ms: u64) -> Location {
    if delta_ms < 1_000 {
        Location::Ms((delta_ms / MS_BUCKET_SPAN_MS) as usize)
    } else if delta_ms < WHEEL_HORIZON_MS {
        // Offset by one: the millisecond wheel owns the first second.
        Location::Second((delta_ms / 1_000 - 1) as usize)
    } else {
        Location::BeyondHorizon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_second_maps_to_ms_buckets() {
        assert_eq!(locate(0), Location::Ms(0));
        assert_eq!(locate(9), Location::Ms(0));
        assert_eq!(locate(10), Location::Ms(1));
        assert_eq!(locate(995), Location::Ms(99));
    }

    #[test]
    fn following_hour_maps_to_second_buckets() {
        assert_eq!(locate(1_000), Location::Second(0));
        assert_eq!(locate(1_999), Location::Second(0));
        assert_eq!(locate(2_000), Location::Second(1));
        assert_eq!(locate(WHEEL_HORIZON_MS - 1), Location::Second(SECOND_BUCKET_COUNT - 2));
    }

    #[test]
    fn past_horizon_is_heap_bound() {
        assert_eq!(locate(WHEEL_HORIZON_MS), Location::BeyondHorizon);
        assert_eq!(locate(WHEEL_HORIZON_MS * 7), Location::BeyondHorizon);
    }
}
