//! Timer entity, addressing, and wire codec.
//!
//! - [`entity`] - The timer itself: timing, callback, replica placement
//! - [`url`] - Opaque URL handle encoding `(id, replica bloom hash)`
//! - [`codec`] - JSON wire form shared by clients and peer replication

pub mod codec;
pub mod entity;
pub mod url;

pub use codec::{decode, encode, Decoded};
pub use entity::{Timer, TimerId};
pub use url::TimerUrl;
