//! Shared database service wrapper used across clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{
    BookkeepingRepository, Database, EntryRepository, LibSqlBookkeepingRepository,
    LibSqlEntryRepository,
};
use crate::models::{ChangeRecord, Entry, QueuedOperation, Snapshot, SyncState, Tombstone};
use crate::store::LocalStore;
use crate::Result;

/// Thread-safe local store backed by one libSQL database.
///
/// Clones share the same connection.
#[derive(Clone)]
pub struct DatabaseService {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl DatabaseService {
    /// Open a database service at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        tracing::debug!("Opening local store at {}", db_path.display());
        let db = Database::open(&db_path).await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory database service (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    /// Path of the database file, if on disk.
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }
}

impl LocalStore for DatabaseService {
    async fn fetch_all(&self, table: &str) -> Result<Snapshot> {
        let db = self.db.lock().await;
        LibSqlEntryRepository::new(db.connection()).snapshot(table).await
    }

    async fn write_all(&self, table: &str, snapshot: &Snapshot) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlEntryRepository::new(db.connection())
            .replace_all(table, snapshot)
            .await
    }

    async fn get_entry(&self, table: &str, key: &str) -> Result<Option<Entry>> {
        let db = self.db.lock().await;
        LibSqlEntryRepository::new(db.connection()).get(table, key).await
    }

    async fn put_entry(&self, table: &str, entry: &Entry) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlEntryRepository::new(db.connection())
            .upsert(table, entry)
            .await
    }

    async fn remove_entry(&self, table: &str, key: &str) -> Result<bool> {
        let db = self.db.lock().await;
        LibSqlEntryRepository::new(db.connection()).remove(table, key).await
    }

    async fn set_remote_ids(&self, table: &str, ids: &[(String, String)]) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlEntryRepository::new(db.connection())
            .set_remote_ids(table, ids)
            .await
    }

    async fn load_sync_state(&self, table: &str) -> Result<Option<SyncState>> {
        let db = self.db.lock().await;
        LibSqlBookkeepingRepository::new(db.connection())
            .load_sync_state(table)
            .await
    }

    async fn save_sync_state(&self, table: &str, state: &SyncState) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlBookkeepingRepository::new(db.connection())
            .save_sync_state(table, state)
            .await
    }

    async fn load_queue(&self, table: &str) -> Result<Vec<QueuedOperation>> {
        let db = self.db.lock().await;
        LibSqlBookkeepingRepository::new(db.connection())
            .load_queue(table)
            .await
    }

    async fn save_queue(&self, table: &str, queue: &[QueuedOperation]) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlBookkeepingRepository::new(db.connection())
            .save_queue(table, queue)
            .await
    }

    async fn load_changes(&self, table: &str) -> Result<Vec<ChangeRecord>> {
        let db = self.db.lock().await;
        LibSqlBookkeepingRepository::new(db.connection())
            .load_changes(table)
            .await
    }

    async fn save_changes(&self, table: &str, changes: &[ChangeRecord]) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlBookkeepingRepository::new(db.connection())
            .save_changes(table, changes)
            .await
    }

    async fn load_tombstones(&self, table: &str) -> Result<Vec<Tombstone>> {
        let db = self.db.lock().await;
        LibSqlBookkeepingRepository::new(db.connection())
            .load_tombstones(table)
            .await
    }

    async fn save_tombstones(&self, table: &str, tombstones: &[Tombstone]) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlBookkeepingRepository::new(db.connection())
            .save_tombstones(table, tombstones)
            .await
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let db = self.db.lock().await;
        LibSqlEntryRepository::new(db.connection()).list_tables().await
    }
}
