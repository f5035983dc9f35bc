//! Sync cycle driver.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::{broadcast, Mutex, Notify};

use super::config::SyncConfig;
use super::deletions::reconcile_deletions;
use super::error::{SyncError, SyncResult};
use super::merge::merge;
use super::queue::{DrainOutcome, OfflineQueue, Settled};
use super::report::{CycleStatus, SyncReport};
use super::session::{Connectivity, SessionProvider};
use super::tracker::ChangeTracker;
use crate::models::{
    validate_key, ChangeAction, Entry, OperationKind, QueuedOperation, Snapshot, SyncState,
    Tombstone,
};
use crate::state::CyclePhase;
use crate::store::{LocalStore, RemoteStore};
use crate::util::now_millis;

const EVENT_CAPACITY: usize = 64;

/// Per-table locks, phase and cancellation signal.
///
/// `cycle` marks a running sync cycle. `writes` is taken by entry mutations
/// and by a cycle once it starts, so the two never interleave.
#[derive(Default)]
struct TableSlot {
    cycle: Mutex<()>,
    writes: Mutex<()>,
    phase: Mutex<CyclePhase>,
    cancel: Notify,
}

/// Point-in-time view of a table's sync bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStatus {
    pub state: SyncState,
    pub phase: CyclePhase,
    pub entries: usize,
    pub pending_changes: usize,
    pub queued_operations: usize,
    pub tombstones: usize,
}

struct CycleFailure {
    error: SyncError,
    partially_applied: bool,
}

impl From<crate::Error> for CycleFailure {
    fn from(error: crate::Error) -> Self {
        Self {
            error: SyncError::LocalStore(error),
            partially_applied: false,
        }
    }
}

trait PartialContext<T> {
    fn after_writes(self) -> Result<T, CycleFailure>;
}

impl<T> PartialContext<T> for crate::Result<T> {
    fn after_writes(self) -> Result<T, CycleFailure> {
        self.map_err(|error| CycleFailure {
            error: SyncError::LocalStore(error),
            partially_applied: true,
        })
    }
}

#[derive(Clone, Copy)]
enum RemoteWrite<'a> {
    Upload(&'a Entry),
    Delete(&'a str),
}

/// Drives sync cycles between a local and a remote store.
///
/// Cycles of one table never overlap; cycles of different tables may run
/// concurrently. Entry mutations go through the orchestrator so they never
/// interleave with a running cycle of the same table.
pub struct SyncOrchestrator<L, R> {
    local: L,
    remote: R,
    session: Arc<dyn SessionProvider + Send + Sync>,
    connectivity: Arc<dyn Connectivity + Send + Sync>,
    config: SyncConfig,
    tables: Mutex<HashMap<String, Arc<TableSlot>>>,
    events: broadcast::Sender<SyncReport>,
}

impl<L: LocalStore, R: RemoteStore> SyncOrchestrator<L, R> {
    pub fn new(
        local: L,
        remote: R,
        session: impl SessionProvider + Send + Sync + 'static,
        connectivity: impl Connectivity + Send + Sync + 'static,
        config: SyncConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            local,
            remote,
            session: Arc::new(session),
            connectivity: Arc::new(connectivity),
            config,
            tables: Mutex::new(HashMap::new()),
            events,
        }
    }

    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub const fn local(&self) -> &L {
        &self.local
    }

    pub const fn remote(&self) -> &R {
        &self.remote
    }

    /// Receive every finished cycle report.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncReport> {
        self.events.subscribe()
    }

    /// Current cycle phase of `table`.
    pub async fn phase(&self, table: &str) -> CyclePhase {
        let slot = self.tables.lock().await.get(table).cloned();
        match slot {
            Some(slot) => *slot.phase.lock().await,
            None => CyclePhase::Idle,
        }
    }

    /// Cancel the cycle of `table` if it is still fetching.
    ///
    /// Returns whether a cancellation was delivered.
    pub async fn cancel(&self, table: &str) -> bool {
        let slot = self.tables.lock().await.get(table).cloned();
        let Some(slot) = slot else {
            return false;
        };
        if *slot.phase.lock().await != CyclePhase::Fetching {
            return false;
        }
        slot.cancel.notify_waiters();
        true
    }

    /// Persisted sync state of `table`, or the default when never synced.
    pub async fn sync_state(&self, table: &str) -> SyncResult<SyncState> {
        Ok(self
            .local
            .load_sync_state(table)
            .await?
            .unwrap_or_else(|| self.default_state()))
    }

    pub async fn status(&self, table: &str) -> SyncResult<TableStatus> {
        Ok(TableStatus {
            state: self.sync_state(table).await?,
            phase: self.phase(table).await,
            entries: self.local.fetch_all(table).await?.len(),
            pending_changes: self.local.load_changes(table).await?.len(),
            queued_operations: self.local.load_queue(table).await?.len(),
            tombstones: self.local.load_tombstones(table).await?.len(),
        })
    }

    /// Run one sync cycle for `table`.
    ///
    /// Returns immediately with [`CycleStatus::InProgress`] when a cycle of
    /// the same table is already running.
    pub async fn request_sync(&self, table: &str) -> SyncReport {
        let slot = self.slot(table).await;
        let Ok(_cycle) = slot.cycle.try_lock() else {
            tracing::debug!("Sync of '{table}' already in progress");
            return SyncReport::new(table, CycleStatus::InProgress);
        };
        // Waits out an in-flight entry mutation
        let _writes = slot.writes.lock().await;

        let report = match self.run_cycle(table, &slot).await {
            Ok(report) => report,
            Err(failure) => {
                tracing::error!("Sync of '{table}' failed: {}", failure.error);
                SyncReport::failed(table, failure.error.to_string(), failure.partially_applied)
            }
        };

        let phase = match report.status {
            CycleStatus::Done | CycleStatus::Skipped => CyclePhase::Done,
            CycleStatus::Failed => CyclePhase::Failed,
            CycleStatus::Cancelled | CycleStatus::InProgress => CyclePhase::Idle,
        };
        Self::set_phase(&slot, phase).await;

        tracing::info!("{}", report.summary());
        // No subscribers is fine
        let _ = self.events.send(report.clone());
        report
    }

    async fn slot(&self, table: &str) -> Arc<TableSlot> {
        self.tables
            .lock()
            .await
            .entry(table.to_string())
            .or_default()
            .clone()
    }

    async fn set_phase(slot: &TableSlot, phase: CyclePhase) {
        let mut current = slot.phase.lock().await;
        if *current != phase {
            tracing::debug!("Sync phase {current:?} -> {phase:?}");
            *current = phase;
        }
    }

    fn default_state(&self) -> SyncState {
        SyncState {
            strategy: self.config.strategy,
            ..SyncState::default()
        }
    }

    fn offline_reason(&self) -> Option<&'static str> {
        if !self.connectivity.is_online() {
            return Some("offline");
        }
        if self.session.current_user_id().is_none() {
            return Some("no signed-in user");
        }
        None
    }

    /// Run a remote call under the configured timeout.
    async fn remote_call<T>(&self, call: impl Future<Output = SyncResult<T>>) -> SyncResult<T> {
        let limit = self.config.remote_timeout;
        tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(SyncError::Timeout(limit)))
    }

    async fn fetch(
        &self,
        table: &str,
        remote_enabled: bool,
    ) -> (crate::Result<Snapshot>, Option<SyncResult<Snapshot>>) {
        if remote_enabled {
            let (local, remote) = tokio::join!(
                self.local.fetch_all(table),
                self.remote_call(self.remote.fetch_all(table))
            );
            (local, Some(remote))
        } else {
            (self.local.fetch_all(table).await, None)
        }
    }

    async fn run_cycle(&self, table: &str, slot: &TableSlot) -> Result<SyncReport, CycleFailure> {
        let started_at = now_millis();
        let offline_reason = self.offline_reason();

        let cancelled = slot.cancel.notified();
        tokio::pin!(cancelled);
        cancelled.as_mut().enable();
        Self::set_phase(slot, CyclePhase::Fetching).await;

        let fetched = tokio::select! {
            () = &mut cancelled => None,
            fetched = self.fetch(table, offline_reason.is_none()) => Some(fetched),
        };
        let Some((local, remote)) = fetched else {
            tracing::info!("Sync of '{table}' cancelled while fetching");
            return Ok(SyncReport::new(table, CycleStatus::Cancelled));
        };
        let local = local?;

        let mut state = self
            .local
            .load_sync_state(table)
            .await?
            .unwrap_or_else(|| self.default_state());

        let remote = match remote {
            Some(Ok(remote)) => remote,
            Some(Err(error)) => {
                tracing::warn!("Remote fetch for '{table}' failed, syncing locally: {error}");
                return self
                    .local_only_cycle(table, &local, &mut state, Some(error.to_string()))
                    .await;
            }
            None => {
                tracing::debug!(
                    "Local-only sync of '{table}': {}",
                    offline_reason.unwrap_or("remote disabled")
                );
                return self.local_only_cycle(table, &local, &mut state, None).await;
            }
        };

        Self::set_phase(slot, CyclePhase::Merging).await;

        let mut tracker =
            ChangeTracker::from_records(self.local.load_changes(table).await?, self.config.change_history_cap);
        let mut queue = OfflineQueue::from_vec(self.local.load_queue(table).await?, self.config.max_retries);
        let mut tombstones = self.local.load_tombstones(table).await?;

        // Queued work gets the first chance to apply
        let drained = {
            let (local_view, remote_view) = (&local, &remote);
            let tombstones = &tombstones;
            queue
                .drain(move |op| async move {
                    self.apply_queued(table, op, local_view, remote_view, tombstones)
                        .await
                })
                .await
        };

        let mut remote_view = remote.clone();
        let mut resolved: BTreeSet<String> = BTreeSet::new();
        for (op, remote_id) in &drained.applied {
            match (op.kind, &op.payload) {
                (OperationKind::Upload, Some(payload)) => {
                    let mut uploaded = payload.clone();
                    if let Some(remote_id) = remote_id {
                        uploaded.remote_id = Some(remote_id.clone());
                    }
                    remote_view.insert(uploaded);
                }
                _ => {
                    remote_view.remove(&op.key);
                }
            }
            resolved.insert(op.key.clone());
        }
        for op in &drained.superseded {
            tracing::debug!("Dropped superseded queued {} for '{}'", op.kind.as_str(), op.key);
        }
        tombstones.retain(|tombstone| {
            !drained
                .applied
                .iter()
                .any(|(op, _)| op.kind == OperationKind::Delete && op.key == tombstone.key)
        });

        let plan = reconcile_deletions(
            &local,
            &remote_view,
            &tombstones,
            &tracker,
            state.last_remote_sync_at,
        );
        let merged = merge(&plan.local, &plan.remote, self.config.strategy);

        // Keys still owned by the queue are retried there, not re-sent here
        let blocked: BTreeSet<&str> = queue
            .iter()
            .map(|op| op.key.as_str())
            .chain(drained.permanent_failures.iter().map(|failure| failure.key.as_str()))
            .collect();

        Self::set_phase(slot, CyclePhase::Applying).await;
        if let Err(error) = self.local.write_all(table, &merged.snapshot).await {
            return Err(self.abort_after_drain(table, &queue, &drained, error).await);
        }

        let mut writes = Vec::new();
        for key in &merged.to_upload {
            if blocked.contains(key.as_str()) {
                continue;
            }
            if let Some(entry) = merged.snapshot.get(key) {
                writes.push(RemoteWrite::Upload(entry));
            }
        }
        for key in &plan.remote_deletes {
            if !blocked.contains(key.as_str()) {
                writes.push(RemoteWrite::Delete(key));
            }
        }

        let results = join_all(writes.into_iter().map(move |write| async move {
            let result = match write {
                RemoteWrite::Upload(entry) => self
                    .remote_call(self.remote.upsert(table, entry))
                    .await
                    .map(Some),
                RemoteWrite::Delete(key) => {
                    self.remote_call(self.remote.delete(table, key)).await.map(|()| None)
                }
            };
            (write, result)
        }))
        .await;

        let mut remote_ids = Vec::new();
        let mut failed_keys: BTreeSet<String> = BTreeSet::new();
        let mut permanent_failures = drained.permanent_failures.clone();
        for (write, result) in results {
            match (write, result) {
                (RemoteWrite::Upload(entry), Ok(remote_id)) => {
                    if let Some(remote_id) = remote_id {
                        if entry.remote_id.as_deref() != Some(remote_id.as_str()) {
                            remote_ids.push((entry.key.clone(), remote_id));
                        }
                    }
                    resolved.insert(entry.key.clone());
                }
                (RemoteWrite::Delete(key), Ok(_)) => {
                    tombstones.retain(|tombstone| tombstone.key != key);
                    resolved.insert(key.to_string());
                }
                (RemoteWrite::Upload(entry), Err(error)) => {
                    tracing::warn!("Upload of '{}' failed: {error}", entry.key);
                    failed_keys.insert(entry.key.clone());
                    let op = QueuedOperation::upload(entry.clone(), now_millis());
                    permanent_failures.extend(queue.enqueue_failed(op, &error));
                }
                (RemoteWrite::Delete(key), Err(error)) => {
                    tracing::warn!("Remote delete of '{key}' failed: {error}");
                    failed_keys.insert(key.to_string());
                    let op = QueuedOperation::delete(key, now_millis());
                    permanent_failures.extend(queue.enqueue_failed(op, &error));
                }
            }
        }

        self.local.set_remote_ids(table, &remote_ids).await.after_writes()?;

        // Done: settle bookkeeping
        tombstones.retain(|tombstone| !plan.resolved_tombstones.contains(&tombstone.key));
        let tombstones = self.expire_tombstones(table, tombstones, started_at);

        let settled_keys: BTreeSet<&str> = merged
            .snapshot
            .keys()
            .chain(plan.local_removals.iter().map(String::as_str))
            .chain(plan.resolved_tombstones.iter().map(String::as_str))
            .chain(resolved.iter().map(String::as_str))
            .filter(|key| {
                !failed_keys.contains(*key)
                    && !queue.contains_key(key)
                    && !permanent_failures.iter().any(|failure| failure.key == *key)
                    && !tombstones.iter().any(|tombstone| tombstone.key == *key)
            })
            .collect();
        tracker.clear(settled_keys, started_at);

        let counts = merged.snapshot.provenance_counts();
        state.last_sync_at = Some(now_millis());
        state.last_remote_sync_at = Some(started_at);
        state.strategy = self.config.strategy;
        state.counts = counts;
        state.last_error = permanent_failures
            .first()
            .map(|failure| format!("'{}' failed permanently: {}", failure.key, failure.reason));

        self.local.save_queue(table, &queue.to_vec()).await.after_writes()?;
        self.local.save_changes(table, &tracker.to_vec()).await.after_writes()?;
        self.local.save_tombstones(table, &tombstones).await.after_writes()?;
        self.local.save_sync_state(table, &state).await.after_writes()?;

        let mut report = SyncReport::new(table, CycleStatus::Done);
        report.local_count = local.len();
        report.remote_count = remote.len();
        report.merged_count = merged.snapshot.len();
        report.conflicts_resolved = merged.conflicts_resolved;
        report.queued_for_retry = queue.len();
        report.permanent_failures = permanent_failures;
        Ok(report)
    }

    /// Fail a cycle whose local apply broke after the queue was drained.
    ///
    /// Drained operations may already have reached the remote store, so the
    /// drained queue is kept and the failure is partial when any applied.
    async fn abort_after_drain(
        &self,
        table: &str,
        queue: &OfflineQueue,
        drained: &DrainOutcome,
        error: crate::Error,
    ) -> CycleFailure {
        if let Err(save_error) = self.local.save_queue(table, &queue.to_vec()).await {
            tracing::warn!("Could not persist drained queue for '{table}': {save_error}");
        }
        CycleFailure {
            error: SyncError::LocalStore(error),
            partially_applied: !drained.applied.is_empty(),
        }
    }

    async fn local_only_cycle(
        &self,
        table: &str,
        local: &Snapshot,
        state: &mut SyncState,
        remote_error: Option<String>,
    ) -> Result<SyncReport, CycleFailure> {
        state.last_sync_at = Some(now_millis());
        state.strategy = self.config.strategy;
        state.counts = local.provenance_counts();
        state.last_error.clone_from(&remote_error);
        self.local.save_sync_state(table, state).await?;

        let mut report = SyncReport::new(table, CycleStatus::Skipped);
        report.local_count = local.len();
        report.merged_count = local.len();
        report.queued_for_retry = self.local.load_queue(table).await?.len();
        report.error = remote_error;
        Ok(report)
    }

    /// Attempt one queued operation, dropping it when a newer copy exists.
    async fn apply_queued(
        &self,
        table: &str,
        op: QueuedOperation,
        local: &Snapshot,
        remote: &Snapshot,
        tombstones: &[Tombstone],
    ) -> SyncResult<Settled> {
        match op.kind {
            OperationKind::Upload => {
                let Some(payload) = op.payload.as_ref() else {
                    return Err(SyncError::InvalidEntry(format!(
                        "queued upload of '{}' has no payload",
                        op.key
                    )));
                };
                let newer_remote = remote
                    .get(&op.key)
                    .is_some_and(|entry| entry.updated_at > payload.updated_at);
                let newer_or_gone_local = !local
                    .get(&op.key)
                    .is_some_and(|entry| entry.updated_at <= payload.updated_at);
                if newer_remote || newer_or_gone_local {
                    return Ok(Settled::Superseded);
                }
                let remote_id = self.remote_call(self.remote.upsert(table, payload)).await?;
                Ok(Settled::Applied(Some(remote_id)))
            }
            OperationKind::Delete => {
                let deleted_at = tombstones
                    .iter()
                    .find(|tombstone| tombstone.key == op.key)
                    .map_or(op.enqueued_at, |tombstone| tombstone.deleted_at);
                let recreated_local = local.contains(&op.key);
                let edited_remote = remote
                    .get(&op.key)
                    .is_some_and(|entry| entry.updated_at > deleted_at);
                if recreated_local || edited_remote {
                    return Ok(Settled::Superseded);
                }
                self.remote_call(self.remote.delete(table, &op.key)).await?;
                Ok(Settled::Applied(None))
            }
        }
    }

    fn expire_tombstones(&self, table: &str, tombstones: Vec<Tombstone>, now: i64) -> Vec<Tombstone> {
        let retention = self.config.tombstone_retention_millis();
        tombstones
            .into_iter()
            .filter(|tombstone| {
                let expired = now.saturating_sub(tombstone.deleted_at) > retention;
                if expired {
                    tracing::warn!(
                        "Tombstone for '{}' in '{table}' expired before the remote delete was confirmed",
                        tombstone.key
                    );
                }
                !expired
            })
            .collect()
    }

    /// Create or update an entry.
    ///
    /// Keeps `created_at` and the remote id of an existing entry and always
    /// moves `updated_at` forward. Waits for a running cycle of the table.
    pub async fn put_entry(
        &self,
        table: &str,
        key: &str,
        description: &str,
        examples: Vec<String>,
    ) -> SyncResult<Entry> {
        validate_key(key).map_err(|error| SyncError::InvalidEntry(error.to_string()))?;
        let slot = self.slot(table).await;
        let _writes = slot.writes.lock().await;

        let now = now_millis();
        let (entry, action) = match self.local.get_entry(table, key).await? {
            Some(mut entry) => {
                entry.description = description.to_string();
                entry.examples = examples;
                entry.touch(now.max(entry.updated_at.saturating_add(1)));
                (entry, ChangeAction::Updated)
            }
            None => (
                Entry::with_timestamps(key, description, examples, now, now),
                ChangeAction::Created,
            ),
        };
        self.local.put_entry(table, &entry).await?;

        let mut tombstones = self.local.load_tombstones(table).await?;
        let before = tombstones.len();
        tombstones.retain(|tombstone| tombstone.key != key);
        if tombstones.len() != before {
            self.local.save_tombstones(table, &tombstones).await?;
        }

        self.record_change(table, key, action, entry.updated_at).await?;
        Ok(entry)
    }

    /// Delete an entry locally, returning whether it existed.
    ///
    /// Entries that reached the remote store leave a tombstone so the next
    /// cycle deletes the remote copy too.
    pub async fn delete_entry(&self, table: &str, key: &str) -> SyncResult<bool> {
        let slot = self.slot(table).await;
        let _writes = slot.writes.lock().await;

        let Some(existing) = self.local.get_entry(table, key).await? else {
            return Ok(false);
        };
        self.local.remove_entry(table, key).await?;

        let now = now_millis().max(existing.updated_at);
        if existing.remote_id.is_some() {
            let mut tombstones = self.local.load_tombstones(table).await?;
            tombstones.retain(|tombstone| tombstone.key != key);
            tombstones.push(Tombstone {
                key: key.to_string(),
                deleted_at: now,
                remote_id: existing.remote_id,
            });
            self.local.save_tombstones(table, &tombstones).await?;
        }

        self.record_change(table, key, ChangeAction::Deleted, now).await?;
        Ok(true)
    }

    pub async fn get_entry(&self, table: &str, key: &str) -> SyncResult<Option<Entry>> {
        Ok(self.local.get_entry(table, key).await?)
    }

    /// Entries of `table` in key order.
    pub async fn list_entries(&self, table: &str) -> SyncResult<Vec<Entry>> {
        Ok(self.local.fetch_all(table).await?.into_iter().collect())
    }

    async fn record_change(
        &self,
        table: &str,
        key: &str,
        action: ChangeAction,
        at: i64,
    ) -> SyncResult<()> {
        let mut tracker = ChangeTracker::from_records(
            self.local.load_changes(table).await?,
            self.config.change_history_cap,
        );
        tracker.record(key, action, at);
        self.local.save_changes(table, &tracker.to_vec()).await?;
        Ok(())
    }
}
