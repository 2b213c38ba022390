//! Error types for the feed engine
//!
//! Propagation policy:
//! - Roster and page-fetch failures surface as a retryable error state
//! - Prefetch and metadata failures are recovered locally and never surface
//! - Stale responses are discarded silently
//! - A timeout is reported exactly like an unreachable upstream

use palate_model::LocationError;
use std::fmt::Display;
use std::time::Duration;

/// Failure reported by a collaborator (remote store, social graph)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Network or service failure
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The collaborator refused the request
    #[error("rejected: {0}")]
    Rejected(String),
}

/// Main engine error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    /// Remote call failed or timed out
    #[error("{operation} unavailable: {reason}")]
    UpstreamUnavailable {
        /// Which remote operation failed
        operation: &'static str,
        /// Underlying cause
        reason: String,
    },

    /// A response arrived for a request that no longer matches the view
    #[error("stale response for {0} discarded")]
    StaleResponse(String),

    /// Corpus-wide counts could not be computed; counts are approximate
    #[error("metadata unavailable, counts are approximate: {0}")]
    PartialMetadataFailure(String),

    /// Configuration is invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// Deep link could not be decoded
    #[error("invalid feed location: {0}")]
    InvalidLocation(#[from] LocationError),
}

impl FeedError {
    /// Wrap a collaborator failure
    #[inline]
    pub fn upstream(operation: &'static str, cause: impl Display) -> Self {
        Self::UpstreamUnavailable {
            operation,
            reason: cause.to_string(),
        }
    }

    /// Timeout, reported as an unavailable upstream
    #[inline]
    #[must_use]
    pub fn timeout(operation: &'static str, after: Duration) -> Self {
        Self::UpstreamUnavailable {
            operation,
            reason: format!("timed out after {}ms", after.as_millis()),
        }
    }

    /// Check if an explicit retry can succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable { .. })
    }

    /// Check if the error belongs in front of the user
    #[inline]
    #[must_use]
    pub fn is_user_visible(&self) -> bool {
        !matches!(
            self,
            Self::StaleResponse(_) | Self::PartialMetadataFailure(_)
        )
    }
}
