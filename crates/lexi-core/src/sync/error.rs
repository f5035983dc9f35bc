//! Error types for the sync engine.

use std::time::Duration;

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during a sync cycle.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Remote store is offline or the session is not authorised.
    #[error("remote store unavailable: {0}")]
    RemoteUnavailable(String),

    /// Remote call failed in a way that may succeed later.
    #[error("transient remote failure: {0}")]
    TransientRemoteFailure(String),

    /// Remote call exceeded its time budget.
    #[error("remote call timed out after {0:?}")]
    Timeout(Duration),

    /// Queued operation exhausted its retries.
    #[error("giving up on '{key}' after {attempts} attempts: {reason}")]
    PermanentRemoteFailure {
        /// Entry key.
        key: String,
        /// Total attempts made.
        attempts: u32,
        /// Last failure.
        reason: String,
    },

    /// Local store failure; aborts the cycle.
    #[error("local store error: {0}")]
    LocalStore(#[from] crate::Error),

    /// Entry rejected before reaching a store.
    #[error("invalid entry: {0}")]
    InvalidEntry(String),
}

impl SyncError {
    /// Returns whether retrying the same call may succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RemoteUnavailable(_) | Self::TransientRemoteFailure(_) | Self::Timeout(_)
        )
    }
}
