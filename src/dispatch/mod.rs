//! Callback dispatch.
//!
//! - [`dispatcher`] - The pop loop and the sink contracts it drives

pub mod dispatcher;

pub use dispatcher::{CallbackSink, DispatchStats, Dispatcher, ReplicationSink};
