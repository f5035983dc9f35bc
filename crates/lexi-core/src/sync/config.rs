//! Configuration for the sync engine.

use std::time::Duration;

use crate::models::ConflictStrategy;

/// Default number of retries before a queued operation is given up.
pub const DEFAULT_MAX_RETRIES: u32 = 5;
/// Default bound on a single remote call.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);
/// Default number of change records kept per table.
pub const DEFAULT_CHANGE_HISTORY_CAP: usize = 1000;
/// Default lifetime of an unconfirmed tombstone (30 days).
pub const DEFAULT_TOMBSTONE_RETENTION: Duration = Duration::from_secs(30 * 24 * 60 * 60);
/// Default period of the automatic sync trigger.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for sync cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Conflict resolution strategy used by the merge.
    pub strategy: ConflictStrategy,
    /// Failed attempts allowed after the first one.
    pub max_retries: u32,
    /// Timeout applied to every remote call.
    pub remote_timeout: Duration,
    /// Maximum number of change records kept per table.
    pub change_history_cap: usize,
    /// How long a tombstone waits for remote confirmation.
    pub tombstone_retention: Duration,
    /// Period of the automatic sync trigger.
    pub sync_interval: Duration,
}

impl SyncConfig {
    /// Creates a configuration with default values.
    pub const fn new() -> Self {
        Self {
            strategy: ConflictStrategy::MostRecent,
            max_retries: DEFAULT_MAX_RETRIES,
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            change_history_cap: DEFAULT_CHANGE_HISTORY_CAP,
            tombstone_retention: DEFAULT_TOMBSTONE_RETENTION,
            sync_interval: DEFAULT_SYNC_INTERVAL,
        }
    }

    /// Sets the conflict strategy.
    #[must_use]
    pub const fn with_strategy(mut self, strategy: ConflictStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the retry cap.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the remote call timeout.
    #[must_use]
    pub const fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    /// Sets the change history cap.
    #[must_use]
    pub const fn with_change_history_cap(mut self, cap: usize) -> Self {
        self.change_history_cap = cap;
        self
    }

    /// Sets the tombstone retention window.
    #[must_use]
    pub const fn with_tombstone_retention(mut self, retention: Duration) -> Self {
        self.tombstone_retention = retention;
        self
    }

    /// Sets the automatic sync period.
    #[must_use]
    pub const fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    /// Tombstone retention in milliseconds, saturating.
    pub fn tombstone_retention_millis(&self) -> i64 {
        i64::try_from(self.tombstone_retention.as_millis()).unwrap_or(i64::MAX)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}
