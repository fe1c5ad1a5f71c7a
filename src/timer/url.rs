//! Opaque timer URL handles.
//!
//! A timer URL path looks like `/timers/{id:016x}{replica_hash:016x}`: two
//! concatenated zero-padded 16-digit hex fields. Clients treat the whole
//! thing as opaque; the service parses it back to recover the id and the
//! replica bloom filter, which together locate the timer anywhere in the
//! cluster.

use crate::core::error::{ChimeError, ChimeResult};
use crate::timer::entity::TimerId;
use std::fmt;

/// Path prefix for timer resources.
pub const TIMERS_PATH_PREFIX: &str = "/timers/";

/// The two fields packed into a timer URL path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerUrl {
    /// Timer identity.
    pub id: TimerId,

    /// Bitwise OR of the replicas' bloom tokens; 0 for a fresh timer.
    pub replica_hash: u64,
}

impl TimerUrl {
    /// Create a handle from its parts.
    pub fn new(id: TimerId, replica_hash: u64) -> Self {
        Self { id, replica_hash }
    }

    /// Parse a URL path (or bare path segment) into its fields.
    ///
    /// Accepts `/timers/<32 hex digits>` or the 32-digit segment alone.
    pub fn parse(path: &str) -> ChimeResult<Self> {
        let segment = path.strip_prefix(TIMERS_PATH_PREFIX).unwrap_or(path);

        if segment.len() != 32 || !segment.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ChimeError::invalid_url(path));
        }

        let id = u64::from_str_radix(&segment[..16], 16)
            .map_err(|_| ChimeError::invalid_url(path))?;
        let replica_hash = u64::from_str_radix(&segment[16..], 16)
            .map_err(|_| ChimeError::invalid_url(path))?;

        Ok(Self { id, replica_hash })
    }

    /// Render the full resource path.
    pub fn path(&self) -> String {
        format!("{}{}", TIMERS_PATH_PREFIX, self)
    }
}

impl fmt::Display for TimerUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}{:016x}", self.id, self.replica_hash)
    }
}
