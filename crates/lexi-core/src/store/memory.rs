//! In-memory remote store.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use super::RemoteStore;
use crate::models::{Entry, Provenance, Snapshot};
use crate::sync::{SyncError, SyncResult};

#[derive(Debug, Default)]
struct MemoryState {
    tables: HashMap<String, Snapshot>,
    offline: bool,
    failing_keys: BTreeSet<String>,
    fetch_delay: Option<Duration>,
    next_id: u64,
    upserts: usize,
    deletes: usize,
}

/// Remote store kept in memory.
///
/// Clones share the same contents, so a test can keep a handle while the
/// orchestrator owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryRemoteStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate losing (or regaining) the network.
    pub async fn set_offline(&self, offline: bool) {
        self.state.lock().await.offline = offline;
    }

    /// Make writes for `key` fail with a transient error.
    pub async fn fail_key(&self, key: impl Into<String>) {
        self.state.lock().await.failing_keys.insert(key.into());
    }

    /// Let writes for `key` succeed again.
    pub async fn heal_key(&self, key: &str) {
        self.state.lock().await.failing_keys.remove(key);
    }

    /// Delay every fetch by `delay`.
    pub async fn set_fetch_delay(&self, delay: Option<Duration>) {
        self.state.lock().await.fetch_delay = delay;
    }

    /// Current contents of a table.
    pub async fn snapshot(&self, table: &str) -> Snapshot {
        self.state
            .lock()
            .await
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Store `entry` directly, as another device would.
    pub async fn seed(&self, table: &str, mut entry: Entry) -> String {
        let mut state = self.state.lock().await;
        let remote_id = match entry.remote_id.clone() {
            Some(id) => id,
            None => state.allocate_id(),
        };
        entry.remote_id = Some(remote_id.clone());
        entry.provenance = Provenance::Remote;
        state.tables.entry(table.to_string()).or_default().insert(entry);
        remote_id
    }

    /// Remove `key` directly, as another device would.
    pub async fn remove(&self, table: &str, key: &str) {
        if let Some(snapshot) = self.state.lock().await.tables.get_mut(table) {
            snapshot.remove(key);
        }
    }

    /// Number of upserts accepted so far.
    pub async fn upsert_count(&self) -> usize {
        self.state.lock().await.upserts
    }

    /// Number of deletes accepted so far.
    pub async fn delete_count(&self) -> usize {
        self.state.lock().await.deletes
    }
}

impl MemoryState {
    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("mem-{}", self.next_id)
    }

    fn check_online(&self) -> SyncResult<()> {
        if self.offline {
            Err(SyncError::RemoteUnavailable("memory remote is offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn check_key(&self, key: &str) -> SyncResult<()> {
        if self.failing_keys.contains(key) {
            Err(SyncError::TransientRemoteFailure(format!(
                "injected failure for '{key}'"
            )))
        } else {
            Ok(())
        }
    }
}

impl RemoteStore for MemoryRemoteStore {
    async fn fetch_all(&self, table: &str) -> SyncResult<Snapshot> {
        let delay = {
            let state = self.state.lock().await;
            state.check_online()?;
            state.fetch_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.lock().await;
        state.check_online()?;
        Ok(state.tables.get(table).cloned().unwrap_or_default())
    }

    async fn upsert(&self, table: &str, entry: &Entry) -> SyncResult<String> {
        let mut state = self.state.lock().await;
        state.check_online()?;
        state.check_key(&entry.key)?;

        let existing = state
            .tables
            .get(table)
            .and_then(|snapshot| snapshot.get(&entry.key))
            .and_then(|stored| stored.remote_id.clone());
        let remote_id = match existing.or_else(|| entry.remote_id.clone()) {
            Some(id) => id,
            None => state.allocate_id(),
        };

        let mut stored = entry.clone();
        stored.remote_id = Some(remote_id.clone());
        stored.provenance = Provenance::Remote;
        state.tables.entry(table.to_string()).or_default().insert(stored);
        state.upserts += 1;
        Ok(remote_id)
    }

    async fn delete(&self, table: &str, key: &str) -> SyncResult<()> {
        let mut state = self.state.lock().await;
        state.check_online()?;
        state.check_key(key)?;

        if let Some(snapshot) = state.tables.get_mut(table) {
            snapshot.remove(key);
        }
        state.deletes += 1;
        Ok(())
    }
}
