//! The shared timer store.
//!
//! A [`TimerStore`] holds every timer owned or replicated by this node and
//! produces the next batch to fire with 10 ms resolution. Inserts, deletes,
//! and pops are O(1) on the hot path; only overflow-heap traffic and the
//! once-a-second bucket redistribution cost more.
//!
//! All state sits behind a single mutex: inserter threads and the
//! dispatcher serialise through it, and every operation completes with
//! bounded work while holding it. Callbacks are never fired under the lock;
//! [`TimerStore::pop_next`] hands the batch out first.

use crate::cluster::view::ClusterView;
use crate::core::time::Clock;
use crate::store::wheel::{
    locate, Location, MS_BUCKET_COUNT, SECOND_BUCKET_COUNT, WHEEL_HORIZON_MS,
};
use crate::timer::entity::{Timer, TimerId};
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::Arc;

/// Per-node timer store backed by a hierarchical timing wheel.
pub struct TimerStore {
    inner: Mutex<StoreInner>,
    view: ClusterView,
}

/// Point-in-time store statistics.
///
/// `heap_depth` counts live overflow entries; a persistently non-zero value
/// means the second wheel is too small for the workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Total timers held (lookup-table size).
    pub total_timers: usize,
    /// Timers currently in the millisecond wheel.
    pub ms_wheel_timers: usize,
    /// Timers currently in the second wheel.
    pub s_wheel_timers: usize,
    /// Live timers in the overflow heap.
    pub heap_depth: usize,
    /// Wall timestamp of millisecond bucket 0.
    pub first_bucket_timestamp: u64,
}

/// Where a stored timer physically sits, with the pop time it was slotted
/// at. Heap removal is lazy: a heap entry is live only while it matches
/// this record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Ms(usize),
    Second(usize),
    Heap,
}

#[derive(Debug, Clone, Copy)]
struct Scheduled {
    slot: Slot,
    pop_ms: u64,
}

/// Overflow-heap entry; ordering is reversed so the earliest pop sits on
/// top of the (max-)binary heap.
#[derive(Debug, PartialEq, Eq)]
struct HeapEntry {
    pop_ms: u64,
    id: TimerId,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .pop_ms
            .cmp(&self.pop_ms)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct StoreInner {
    /// Exclusive owner of every stored timer.
    timers: HashMap<TimerId, Timer>,

    /// Physical slot and scheduled pop time per stored timer.
    scheduled: HashMap<TimerId, Scheduled>,

    ms_buckets: Vec<HashSet<TimerId>>,
    s_buckets: Vec<HashSet<TimerId>>,
    overflow: BinaryHeap<HeapEntry>,

    /// Wall time of millisecond bucket 0; advances one second per
    /// millisecond-wheel rollover.
    first_bucket_timestamp: u64,

    current_ms_bucket: usize,
    current_s_bucket: usize,
}

impl TimerStore {
    /// Create a store anchored at the current wall time.
    pub fn new(view: ClusterView, clock: &dyn Clock) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                timers: HashMap::new(),
                scheduled: HashMap::new(),
                ms_buckets: vec![HashSet::new(); MS_BUCKET_COUNT],
                s_buckets: vec![HashSet::new(); SECOND_BUCKET_COUNT],
                overflow: BinaryHeap::new(),
                first_bucket_timestamp: clock.now_ms(),
                current_ms_bucket: 0,
                current_s_bucket: 0,
            }),
            view,
        }
    }

    /// Take ownership of a timer.
    ///
    /// If a timer with the same id is already stored, precedence decides:
    /// the larger (start_time, sequence_number) wins and the loser is
    /// dropped. A winning tombstone inherits the stored timer's interval so
    /// it outlasts the original's pop schedule on every replica.
    pub fn add(&self, timer: Timer) {
        self.inner.lock().add(timer, &self.view);
    }

    /// Add a batch of timers, draining the input.
    pub fn add_many(&self, timers: Vec<Timer>) {
        let mut inner = self.inner.lock();
        for timer in timers {
            inner.add(timer, &self.view);
        }
    }

    /// Delete a timer by id; a no-op for unknown ids.
    pub fn delete(&self, id: TimerId) {
        self.inner.lock().remove(id);
    }

    /// Pop the timers scheduled for the current 10 ms slot, transferring
    /// ownership to the caller.
    ///
    /// An empty store pops nothing and leaves the wheel where it is;
    /// otherwise the millisecond cursor advances (rolling the wheels
    /// forward as needed) to the first non-empty bucket and drains it.
    pub fn pop_next(&self) -> Vec<Timer> {
        self.inner.lock().pop_next()
    }

    /// Number of timers held.
    pub fn len(&self) -> usize {
        self.inner.lock().timers.len()
    }

    /// Check whether the store holds no timers.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().timers.is_empty()
    }

    /// Snapshot store statistics.
    pub fn stats(&self) -> StoreStats {
        self.inner.lock().stats()
    }

    /// The cluster view this store schedules against.
    pub fn view(&self) -> &ClusterView {
        &self.view
    }
}

impl StoreInner {
    fn add(&mut self, mut timer: Timer, view: &ClusterView) {
        if let Some(existing) = self.timers.get(&timer.id) {
            if (timer.start_time, timer.sequence_number)
                < (existing.start_time, existing.sequence_number)
            {
                // The stored timer is more recent; drop the newcomer.
                return;
            }

            if timer.is_tombstone() {
                // Learn the interval so the tombstone lasts long enough to
                // suppress the stored timer's remaining pops.
                timer.interval = existing.interval;
                timer.repeat_for = existing.interval;
            }

            self.remove(timer.id);
        }

        let pop_ms = timer.next_pop_time(view);
        let id = timer.id;
        self.timers.insert(id, timer);
        self.place(id, pop_ms);
    }

    fn remove(&mut self, id: TimerId) -> Option<Timer> {
        let timer = self.timers.remove(&id)?;
        if let Some(sched) = self.scheduled.remove(&id) {
            match sched.slot {
                Slot::Ms(i) => {
                    self.ms_buckets[i].remove(&id);
                }
                Slot::Second(j) => {
                    self.s_buckets[j].remove(&id);
                }
                // Heap entries are invalidated lazily: with no scheduled
                // record they are skipped when the heap drains.
                Slot::Heap => {}
            }
        }
        Some(timer)
    }

    fn pop_next(&mut self) -> Vec<Timer> {
        let mut batch = Vec::new();

        // No timers at all: do not advance the wheel, the dispatcher will
        // ask again.
        if self.timers.is_empty() {
            return batch;
        }

        // Find the first bucket that will pop.
        while self.ms_buckets[self.current_ms_bucket].is_empty() {
            if self.current_ms_bucket >= MS_BUCKET_COUNT - 1 {
                self.refill_ms_buckets();
            } else {
                self.current_ms_bucket += 1;
            }
        }

        let ids: Vec<TimerId> = self.ms_buckets[self.current_ms_bucket].drain().collect();
        for id in ids {
            self.scheduled.remove(&id);
            // Bucket membership implies table membership.
            let timer = self
                .timers
                .remove(&id)
                .expect("timer in wheel bucket missing from lookup table");
            batch.push(timer);
        }

        batch
    }

    /// Roll the millisecond wheel into the next second.
    fn refill_ms_buckets(&mut self) {
        if self.current_s_bucket >= SECOND_BUCKET_COUNT {
            self.refill_s_buckets();
        }

        // Time advances by one second.
        self.current_ms_bucket = 0;
        self.first_bucket_timestamp += 1_000;

        self.distribute_s_bucket(self.current_s_bucket);
        self.current_s_bucket += 1;
    }

    /// Spread a second bucket's timers over the millisecond wheel.
    fn distribute_s_bucket(&mut self, index: usize) {
        let ids: Vec<TimerId> = self.s_buckets[index].drain().collect();
        for id in ids {
            let pop_ms = self
                .scheduled
                .get(&id)
                .map(|s| s.pop_ms)
                .expect("timer in second bucket missing its schedule record");
            self.place(id, pop_ms);
        }
    }

    /// Start a new revolution of the second wheel, pulling overflow timers
    /// that now fall within the horizon out of the heap.
    fn refill_s_buckets(&mut self) {
        self.current_s_bucket = 0;

        while let Some(entry) = self.overflow.peek() {
            // Skip entries whose timer was deleted or rescheduled since
            // they were pushed.
            let live = self
                .scheduled
                .get(&entry.id)
                .is_some_and(|s| s.slot == Slot::Heap && s.pop_ms == entry.pop_ms);
            if !live {
                self.overflow.pop();
                continue;
            }

            if entry.pop_ms.saturating_sub(self.first_bucket_timestamp) >= WHEEL_HORIZON_MS {
                // Still beyond the horizon; so is everything under it.
                break;
            }

            let entry = self.overflow.pop().expect("peeked heap entry vanished");
            self.place(entry.id, entry.pop_ms);
        }
    }

    /// Slot a timer (already in the lookup table) by its pop time.
    fn place(&mut self, id: TimerId, pop_ms: u64) {
        let delta = if pop_ms < self.first_bucket_timestamp {
            tracing::warn!(
                id,
                pop_ms,
                first_bucket_timestamp = self.first_bucket_timestamp,
                "timer scheduled after its pop time, window condition detected"
            );
            0
        } else {
            pop_ms - self.first_bucket_timestamp
        };

        let slot = match locate(delta) {
            Location::Ms(i) => {
                self.ms_buckets[i].insert(id);
                Slot::Ms(i)
            }
            Location::Second(offset) => {
                // Physical slots trail the cursor so the offset keeps
                // meaning "seconds from now" as the wheel turns.
                let j = (self.current_s_bucket + offset) % SECOND_BUCKET_COUNT;
                self.s_buckets[j].insert(id);
                Slot::Second(j)
            }
            Location::BeyondHorizon => {
                tracing::warn!(
                    id,
                    pop_ms,
                    "timer beyond the second-wheel horizon, adding to overflow heap; \
                     consider a larger second wheel"
                );
                self.overflow.push(HeapEntry { pop_ms, id });
                Slot::Heap
            }
        };

        self.scheduled.insert(id, Scheduled { slot, pop_ms });
    }

    fn stats(&self) -> StoreStats {
        let mut ms_wheel_timers = 0;
        let mut s_wheel_timers = 0;
        let mut heap_depth = 0;

        for sched in self.scheduled.values() {
            match sched.slot {
                Slot::Ms(_) => ms_wheel_timers += 1,
                Slot::Second(_) => s_wheel_timers += 1,
                Slot::Heap => heap_depth += 1,
            }
        }

        StoreStats {
            total_timers: self.timers.len(),
            ms_wheel_timers,
            s_wheel_timers,
            heap_depth,
            first_bucket_timestamp: self.first_bucket_timestamp,
        }
    }
}
