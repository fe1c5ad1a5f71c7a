//! The dispatch loop.
//!
//! A [`Dispatcher`] owns a worker thread that asks the store for the due
//! batch every ~10 ms and walks each popped timer through its pop:
//!
//! 1. tombstones have done their job once popped and are discarded;
//! 2. live timers are fired through the [`CallbackSink`] (the HTTP client
//!    lives behind it, outside the core);
//! 3. the sequence number advances and, while pops remain within the
//!    repeat-for window, the timer goes straight back into the store;
//! 4. a timer past its final pop becomes a tombstone, is re-added so late
//!    replica attempts find it, and is pushed to peers through the
//!    [`ReplicationSink`].
//!
//! Delivery is at-least-once: a failed callback is logged and the schedule
//! still advances, and replica stagger plus tombstones keep duplicate
//! firing rare rather than impossible.

use crate::store::timer_store::TimerStore;
use crate::timer::entity::Timer;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Fires a timer's HTTP callback. Implementations must not block longer
/// than they can afford to delay the rest of the batch.
pub trait CallbackSink: Send + Sync {
    /// Fire the callback; returns whether delivery succeeded.
    fn fire(&self, timer: &Timer) -> bool;
}

/// Pushes timer state to peer replicas.
pub trait ReplicationSink: Send + Sync {
    /// Replicate the timer (typically its wire body) to every address in
    /// `timer.replicas` and `timer.extra_replicas` other than this node.
    fn replicate(&self, timer: &Timer);
}

/// Counters exposed by the dispatch loop.
#[derive(Debug, Default)]
pub struct DispatchCounters {
    batches: AtomicU64,
    fired: AtomicU64,
    failed: AtomicU64,
    tombstoned: AtomicU64,
}

/// Point-in-time snapshot of [`DispatchCounters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    /// Non-empty batches popped.
    pub batches: u64,
    /// Callbacks fired successfully.
    pub fired: u64,
    /// Callbacks that failed delivery.
    pub failed: u64,
    /// Timers retired to tombstones after their final pop.
    pub tombstoned: u64,
}

/// Pops due timers and fires their callbacks out-of-band.
pub struct Dispatcher {
    store: Arc<TimerStore>,
    callbacks: Arc<dyn CallbackSink>,
    replication: Arc<dyn ReplicationSink>,
    interval: Duration,
    counters: Arc<DispatchCounters>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl Dispatcher {
    /// Create a dispatcher over the given store and sinks.
    pub fn new(
        store: Arc<TimerStore>,
        callbacks: Arc<dyn CallbackSink>,
        replication: Arc<dyn ReplicationSink>,
        interval_ms: u64,
    ) -> Self {
        Self {
            store,
            callbacks,
            replication,
            interval: Duration::from_millis(interval_ms),
            counters: Arc::new(DispatchCounters::default()),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Spawn the worker thread.
    pub fn start(&mut self) {
        if self.running.swap(true, Ordering::AcqRel) {
            return;
        }

        let store = Arc::clone(&self.store);
        let callbacks = Arc::clone(&self.callbacks);
        let replication = Arc::clone(&self.replication);
        let counters = Arc::clone(&self.counters);
        let running = Arc::clone(&self.running);
        let interval = self.interval;

        self.worker = Some(
            std::thread::Builder::new()
                .name("chime-dispatch".to_string())
                .spawn(move || {
                    tracing::info!(interval_ms = interval.as_millis() as u64, "dispatcher started");
                    while running.load(Ordering::Acquire) {
                        // The store lock is released before any callback
                        // fires.
                        let batch = store.pop_next();
                        if !batch.is_empty() {
                            counters.batches.fetch_add(1, Ordering::Relaxed);
                            process_batch(batch, &store, &*callbacks, &*replication, &counters);
                        }
                        std::thread::sleep(interval);
                    }
                    tracing::info!("dispatcher stopped");
                })
                .expect("failed to spawn dispatcher thread"),
        );
    }

    /// Stop the worker and wait for it to exit.
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }

    /// Check whether the worker is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Snapshot the dispatch counters.
    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            batches: self.counters.batches.load(Ordering::Relaxed),
            fired: self.counters.fired.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            tombstoned: self.counters.tombstoned.load(Ordering::Relaxed),
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Walk one popped batch through callbacks and rescheduling.
fn process_batch(
    batch: Vec<Timer>,
    store: &TimerStore,
    callbacks: &dyn CallbackSink,
    replication: &dyn ReplicationSink,
    counters: &DispatchCounters,
) {
    for mut timer in batch {
        if timer.is_tombstone() {
            // The tombstone has outlived the pops it was suppressing.
            tracing::debug!(id = timer.id, "tombstone expired");
            continue;
        }

        if callbacks.fire(&timer) {
            counters.fired.fetch_add(1, Ordering::Relaxed);
        } else {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                id = timer.id,
                callback_url = %timer.callback_url,
                "callback delivery failed; schedule advances regardless"
            );
        }

        timer.sequence_number += 1;

        if timer.has_remaining_pops() {
            store.add(timer);
        } else {
            // Final pop: leave a tombstone behind so replicas that still
            // hold the live timer stand down, and tell them about it.
            timer.become_tombstone();
            counters.tombstoned.fetch_add(1, Ordering::Relaxed);
            replication.replicate(&timer);
            store.add(timer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::view::ClusterView;
    use crate::core::time::ManualClock;
    use parking_lot::Mutex;

    struct RecordingSink {
        fired: Mutex<Vec<u64>>,
        succeed: bool,
    }

    impl CallbackSink for RecordingSink {
        fn fire(&self, timer: &Timer) -> bool {
            self.fired.lock().push(timer.id);
            self.succeed
        }
    }

    struct RecordingReplication {
        replicated: Mutex<Vec<u64>>,
    }

    impl ReplicationSink for RecordingReplication {
        fn replicate(&self, timer: &Timer) {
            self.replicated.lock().push(timer.id);
        }
    }

    fn store() -> Arc<TimerStore> {
        let clock = ManualClock::at(1_000_000);
        let view = ClusterView::new("10.0.0.1", vec!["10.0.0.1".to_string()], 7253);
        Arc::new(TimerStore::new(view, clock.as_ref()))
    }

    fn live_timer(id: u64, interval: u64, repeat_for: u64) -> Timer {
        let clock = ManualClock::at(1_000_000);
        let mut t = Timer::new(id, interval, repeat_for, clock.as_ref());
        t.replicas = vec!["10.0.0.1".to_string()];
        t.callback_url = "http://localhost:80/callback".to_string();
        t.callback_body = "stuff".to_string();
        t
    }

    #[test]
    fn repeater_is_rescheduled_with_next_sequence() {
        let store = store();
        let sink = Arc::new(RecordingSink {
            fired: Mutex::new(Vec::new()),
            succeed: true,
        });
        let replication = Arc::new(RecordingReplication {
            replicated: Mutex::new(Vec::new()),
        });
        let counters = DispatchCounters::default();

        // Three total pops: repeat_for / interval + 1.
        let timer = live_timer(1, 100, 200);
        process_batch(
            vec![timer],
            &store,
            sink.as_ref(),
            replication.as_ref(),
            &counters,
        );

        assert_eq!(sink.fired.lock().as_slice(), &[1]);
        assert_eq!(store.len(), 1);
        assert!(replication.replicated.lock().is_empty());
    }

    #[test]
    fn final_pop_tombstones_and_replicates() {
        let store = store();
        let sink = Arc::new(RecordingSink {
            fired: Mutex::new(Vec::new()),
            succeed: true,
        });
        let replication = Arc::new(RecordingReplication {
            replicated: Mutex::new(Vec::new()),
        });
        let counters = DispatchCounters::default();

        let mut timer = live_timer(2, 100, 200);
        timer.sequence_number = 2;
        process_batch(
            vec![timer],
            &store,
            sink.as_ref(),
            replication.as_ref(),
            &counters,
        );

        // Fired once, then retired: the tombstone is stored and replicated.
        assert_eq!(sink.fired.lock().as_slice(), &[2]);
        assert_eq!(replication.replicated.lock().as_slice(), &[2]);
        assert_eq!(counters.tombstoned.load(Ordering::Relaxed), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn popped_tombstone_is_discarded() {
        let store = store();
        let sink = Arc::new(RecordingSink {
            fired: Mutex::new(Vec::new()),
            succeed: true,
        });
        let replication = Arc::new(RecordingReplication {
            replicated: Mutex::new(Vec::new()),
        });
        let counters = DispatchCounters::default();

        let mut timer = live_timer(3, 100, 200);
        timer.become_tombstone();
        process_batch(
            vec![timer],
            &store,
            sink.as_ref(),
            replication.as_ref(),
            &counters,
        );

        assert!(sink.fired.lock().is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn failed_callback_still_advances_schedule() {
        let store = store();
        let sink = Arc::new(RecordingSink {
            fired: Mutex::new(Vec::new()),
            succeed: false,
        });
        let replication = Arc::new(RecordingReplication {
            replicated: Mutex::new(Vec::new()),
        });
        let counters = DispatchCounters::default();

        process_batch(
            vec![live_timer(4, 100, 200)],
            &store,
            sink.as_ref(),
            replication.as_ref(),
            &counters,
        );

        assert_eq!(counters.failed.load(Ordering::Relaxed), 1);
        assert_eq!(store.len(), 1);
    }
}
