//! Operations and observability.
//!
//! - [`observability`] - Service statistics and health reporting

pub mod observability;
