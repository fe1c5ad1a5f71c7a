//! Error types.
//!
//! Chime surfaces a small set of hard errors to callers. Soft conditions
//! (overdue timers, timers past the wheel horizon) are handled in place and
//! logged by the store rather than returned; a duplicate timer that loses
//! the precedence comparison is dropped silently.

use thiserror::Error;

/// Errors surfaced by the timer core.
#[derive(Debug, Error)]
pub enum ChimeError {
    /// Malformed wire JSON or a structural violation in a timer body.
    ///
    /// The reason names the offending field and is safe to return to the
    /// client verbatim. No store state changes on a decode failure.
    #[error("failed to decode timer: {reason}")]
    Decode { reason: String },

    /// A timer URL path that does not parse as `/timers/` followed by
    /// 32 lowercase hex digits (16 for the id, 16 for the replica hash).
    #[error("invalid timer URL path: {path}")]
    InvalidTimerUrl { path: String },

    /// Replica derivation was asked to run against an empty cluster view.
    #[error("cluster view contains no nodes")]
    EmptyCluster,
}

impl ChimeError {
    /// Create a Decode error from any displayable reason.
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
        }
    }

    /// Create an InvalidTimerUrl error.
    pub fn invalid_url(path: impl Into<String>) -> Self {
        Self::InvalidTimerUrl { path: path.into() }
    }

    /// Check if this error is a client error (bad request) as opposed to a
    /// service-side condition.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::InvalidTimerUrl { .. })
    }
}

/// Result type using ChimeError.
pub type ChimeResult<T> = Result<T, ChimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_carries_reason() {
        let err = ChimeError::decode("'interval' should be an integer");
        assert!(err.to_string().contains("'interval'"));
        assert!(err.is_client_error());
    }

    #[test]
    fn empty_cluster_is_not_client_error() {
        assert!(!ChimeError::EmptyCluster.is_client_error());
    }
}
