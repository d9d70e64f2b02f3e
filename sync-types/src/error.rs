//! Error taxonomy for vidsync.
//!
//! One shared [`SyncError`] enum crosses component boundaries; the retry
//! executor never inspects concrete variants, only the [`ErrorClass`]
//! returned by [`SyncError::class`]. Remote outcomes are tagged results, not
//! exceptions driving control flow.
//!
//! Every variant carries owned strings/scalars so the whole enum is `Clone`;
//! the token manager broadcasts a failed refresh to all waiters of that
//! round, which requires cloning the error.

use crate::ids::PlaylistId;
use thiserror::Error;

/// Errors that can occur during synchronization.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    /// Remote playlist or video does not exist (fatal, never retried).
    #[error("remote resource not found: {0}")]
    NotFound(String),

    /// Daily quota budget denied the call, or the remote signalled quota
    /// exhaustion. Fatal for this run; carries when the budget resets.
    #[error("quota exceeded: {remaining} units remaining, resets at {reset_at}")]
    QuotaExceeded {
        /// Units still available in the current UTC-day bucket.
        remaining: u64,
        /// Unix timestamp of the next UTC midnight.
        reset_at: i64,
    },

    /// Access token rejected by the remote. Handled transparently by one
    /// refresh-and-retry; surfaced only if that recovery fails.
    #[error("authorization expired")]
    AuthExpired,

    /// Token refresh itself failed (fatal).
    #[error("token refresh failed: {0}")]
    AuthRefreshFailed(String),

    /// Remote asked us to slow down (transient, retried with backoff).
    #[error("rate limited by remote")]
    RateLimited,

    /// Network-level failure (transient, retried with backoff).
    #[error("network error: {0}")]
    Network(String),

    /// All retry attempts were consumed on transient failures.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Display form of the last transient error.
        last: String,
    },

    /// A sync run is already in flight for this playlist. Not a failure of
    /// the playlist itself, just a rejected trigger.
    #[error("sync already running for playlist {0}")]
    SyncInProgress(PlaylistId),

    /// Malformed schedule input, rejected before touching the engine.
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    /// Persistence gateway failure (infrastructure-level).
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Internal invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Retry classification consumed by the retry executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Retry with exponential backoff.
    Transient,
    /// Refresh the token once, then retry the same attempt.
    AuthExpired,
    /// Abort immediately, surface the reset time to the caller.
    QuotaExceeded,
    /// Abort immediately, no recovery.
    Fatal,
}

impl SyncError {
    /// Classify this error for the retry executor.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::RateLimited | Self::Network(_) => ErrorClass::Transient,
            Self::AuthExpired => ErrorClass::AuthExpired,
            Self::QuotaExceeded { .. } => ErrorClass::QuotaExceeded,
            Self::NotFound(_)
            | Self::AuthRefreshFailed(_)
            | Self::RetriesExhausted { .. }
            | Self::SyncInProgress(_)
            | Self::InvalidSchedule(_)
            | Self::Persistence(_)
            | Self::Internal(_) => ErrorClass::Fatal,
        }
    }
}

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SyncError::NotFound("playlist PL123".into());
        assert_eq!(err.to_string(), "remote resource not found: playlist PL123");
    }

    #[test]
    fn quota_error_carries_reset_time() {
        let err = SyncError::QuotaExceeded {
            remaining: 1,
            reset_at: 1_700_006_400,
        };
        assert!(err.to_string().contains("1700006400"));
    }

    #[test]
    fn transient_classification() {
        assert_eq!(SyncError::RateLimited.class(), ErrorClass::Transient);
        assert_eq!(
            SyncError::Network("connection reset".into()).class(),
            ErrorClass::Transient
        );
    }

    #[test]
    fn auth_expired_classification() {
        assert_eq!(SyncError::AuthExpired.class(), ErrorClass::AuthExpired);
        // A failed refresh is NOT retried as auth-expired again.
        assert_eq!(
            SyncError::AuthRefreshFailed("revoked".into()).class(),
            ErrorClass::Fatal
        );
    }

    #[test]
    fn quota_classification() {
        let err = SyncError::QuotaExceeded {
            remaining: 0,
            reset_at: 0,
        };
        assert_eq!(err.class(), ErrorClass::QuotaExceeded);
    }

    #[test]
    fn fatal_classification() {
        assert_eq!(SyncError::NotFound("x".into()).class(), ErrorClass::Fatal);
        assert_eq!(
            SyncError::RetriesExhausted {
                attempts: 5,
                last: "timeout".into()
            }
            .class(),
            ErrorClass::Fatal
        );
    }

    #[test]
    fn error_is_clone() {
        let err = SyncError::AuthExpired;
        let cloned = err.clone();
        assert_eq!(err, cloned);
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncError>();
    }
}
