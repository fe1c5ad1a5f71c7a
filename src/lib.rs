//! Chime - distributed, replicated timer service.
//!
//! Chime accepts timer definitions (HTTP callbacks to fire at a future
//! time, possibly repeating), hands back an opaque URL, and fires each
//! timer at the right moment on the right cluster node. Timers are
//! replicated: successive replicas attempt each pop on a staggered
//! schedule, so a node failure delays a callback by seconds instead of
//! losing it. Deletion and completion propagate as tombstones that
//! suppress stale pops on every replica.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       HTTP surface (external)                   │
//! │      create / replace / delete          peer replication        │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Timer model                              │
//! │   wire codec │ URL handles │ replica placement │ tombstones     │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Timer store                              │
//! │   100 × 10 ms wheel │ 3600 × 1 s wheel │ overflow heap          │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Dispatch loop                            │
//! │     ~10 ms pops │ callback sink │ reschedule │ tombstone        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Module Organization
//!
//! ## Core
//! - [`core::config`] - Configuration parsing and validation
//! - [`core::runtime`] - Runtime orchestration
//! - [`core::time`] - Wall-clock abstraction
//! - [`core::error`] - Error types
//!
//! ## Cluster
//! - [`cluster::view`] - Read-only cluster snapshot and bloom tokens
//! - [`cluster::id`] - Cluster-unique timer id generation
//!
//! ## Timer model
//! - [`timer::entity`] - The timer entity and replica placement
//! - [`timer::url`] - Opaque URL handles
//! - [`timer::codec`] - JSON wire codec
//!
//! ## Storage and dispatch
//! - [`store::timer_store`] - Hierarchical timing-wheel store
//! - [`dispatch::dispatcher`] - Pop loop and sink contracts
//!
//! ## Operations
//! - [`ops::observability`] - Statistics and health
//!
//! ## CLI
//! - [`cli::commands`] - CLI command implementations
//!
//! # Key Invariants
//!
//! - A timer's replica set is reconstructible from its URL and the shared
//!   cluster view alone; no lookup or peer round-trip is required.
//! - Between timers with the same id, the larger (start_time,
//!   sequence_number) pair wins, regardless of arrival order.
//! - Every stored timer sits in exactly one wheel bucket or the overflow
//!   heap, and in the lookup table.
//! - Delivery is at-least-once: replica stagger plus tombstones bound
//!   duplicate firing, they do not eliminate it.

// Core infrastructure
pub mod core;

// Cluster membership and identity
pub mod cluster;

// Timer model and addressing
pub mod timer;

// Per-node timer storage
pub mod store;

// Callback dispatch
pub mod dispatch;

// Operations and observability
pub mod ops;

// CLI
pub mod cli;

// Re-exports for convenience
pub use self::core::{config, error, runtime, time};
pub use cluster::{id, view};
pub use dispatch::dispatcher;
pub use ops::observability;
pub use store::timer_store;
pub use timer::{codec, entity, url};
