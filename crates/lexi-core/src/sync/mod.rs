//! Dual-store synchronization engine.
//!
//! A cycle fetches both snapshots, drains the offline queue, reconciles
//! deletions, merges, writes the merged snapshot locally and then pushes the
//! changes the remote store is missing. Failed remote writes are queued and
//! retried on later cycles.

mod config;
mod deletions;
mod error;
mod merge;
mod orchestrator;
mod queue;
mod report;
mod session;
mod tracker;
mod triggers;

pub use config::{
    SyncConfig, DEFAULT_CHANGE_HISTORY_CAP, DEFAULT_MAX_RETRIES, DEFAULT_REMOTE_TIMEOUT,
    DEFAULT_SYNC_INTERVAL, DEFAULT_TOMBSTONE_RETENTION,
};
pub use deletions::{reconcile_deletions, DeletionPlan};
pub use error::{SyncError, SyncResult};
pub use merge::{merge, MergeResult};
pub use orchestrator::{SyncOrchestrator, TableStatus};
pub use queue::{DrainOutcome, OfflineQueue, PermanentFailure, Settled};
pub use report::{CycleStatus, SyncReport};
pub use session::{Connectivity, ConnectivityFlag, SessionProvider, StaticSession};
pub use tracker::ChangeTracker;
pub use triggers::{SyncTrigger, SyncTriggers};
