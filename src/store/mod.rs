//! Per-node timer storage.
//!
//! - [`wheel`] - Bucket geometry and location math
//! - [`timer_store`] - The shared hierarchical timing-wheel store

pub mod timer_store;
pub mod wheel;

pub use timer_store::{StoreStats, TimerStore};
