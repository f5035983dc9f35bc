//! Entry store adapters.
//!
//! [`LocalStore`] is the durable on-device copy plus sync bookkeeping.
//! [`RemoteStore`] is the network copy shared across devices.

mod http;
mod memory;

pub use http::HttpRemoteStore;
pub use memory::MemoryRemoteStore;

use crate::error::Result;
use crate::models::{ChangeRecord, Entry, QueuedOperation, Snapshot, SyncState, Tombstone};
use crate::sync::SyncResult;

/// Durable local persistence for entries and sync metadata (async)
#[allow(async_fn_in_trait)]
pub trait LocalStore {
    /// Load every entry of a table; empty when the table is unknown
    async fn fetch_all(&self, table: &str) -> Result<Snapshot>;

    /// Atomically replace a table with `snapshot`
    async fn write_all(&self, table: &str, snapshot: &Snapshot) -> Result<()>;

    /// Get one entry
    async fn get_entry(&self, table: &str, key: &str) -> Result<Option<Entry>>;

    /// Insert or replace one entry
    async fn put_entry(&self, table: &str, entry: &Entry) -> Result<()>;

    /// Remove one entry, returning whether it existed
    async fn remove_entry(&self, table: &str, key: &str) -> Result<bool>;

    /// Record remote ids returned by uploads
    async fn set_remote_ids(&self, table: &str, ids: &[(String, String)]) -> Result<()>;

    async fn load_sync_state(&self, table: &str) -> Result<Option<SyncState>>;

    async fn save_sync_state(&self, table: &str, state: &SyncState) -> Result<()>;

    async fn load_queue(&self, table: &str) -> Result<Vec<QueuedOperation>>;

    async fn save_queue(&self, table: &str, queue: &[QueuedOperation]) -> Result<()>;

    async fn load_changes(&self, table: &str) -> Result<Vec<ChangeRecord>>;

    async fn save_changes(&self, table: &str, changes: &[ChangeRecord]) -> Result<()>;

    async fn load_tombstones(&self, table: &str) -> Result<Vec<Tombstone>>;

    async fn save_tombstones(&self, table: &str, tombstones: &[Tombstone]) -> Result<()>;

    /// Tables that hold entries or bookkeeping
    async fn list_tables(&self) -> Result<Vec<String>>;
}

/// Shared remote copy of a user's entries (async)
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    /// Load every entry of a table
    ///
    /// Fails with `RemoteUnavailable` when offline or unauthenticated.
    async fn fetch_all(&self, table: &str) -> SyncResult<Snapshot>;

    /// Create or replace one entry, returning its remote id
    ///
    /// An entry that already has a remote id keeps it.
    async fn upsert(&self, table: &str, entry: &Entry) -> SyncResult<String>;

    /// Delete one entry; deleting a missing key succeeds
    async fn delete(&self, table: &str, key: &str) -> SyncResult<()>;
}
