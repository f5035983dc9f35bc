//! Durable buffer of remote writes awaiting retry.

use std::collections::VecDeque;
use std::future::Future;

use serde::Serialize;

use crate::models::{OperationKind, QueuedOperation};

use super::error::{SyncError, SyncResult};

/// How a drained operation was settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled {
    /// Written to the remote store; uploads carry the returned remote id.
    Applied(Option<String>),
    /// Obsolete; a newer copy already exists in one of the stores.
    Superseded,
}

/// An operation that exhausted its retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermanentFailure {
    pub key: String,
    pub kind: OperationKind,
    pub attempts: u32,
    pub reason: String,
}

impl From<PermanentFailure> for SyncError {
    fn from(failure: PermanentFailure) -> Self {
        Self::PermanentRemoteFailure {
            key: failure.key,
            attempts: failure.attempts,
            reason: failure.reason,
        }
    }
}

/// Result of one pass over the queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainOutcome {
    /// Operations written to the remote store, in order, with returned remote ids.
    pub applied: Vec<(QueuedOperation, Option<String>)>,
    /// Operations dropped as obsolete.
    pub superseded: Vec<QueuedOperation>,
    /// Operations still queued after the pass.
    pub retained: usize,
    /// Operations removed after too many failures.
    pub permanent_failures: Vec<PermanentFailure>,
}

/// Ordered queue of remote writes, at most one per key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflineQueue {
    ops: VecDeque<QueuedOperation>,
    max_retries: u32,
}

impl OfflineQueue {
    pub const fn new(max_retries: u32) -> Self {
        Self {
            ops: VecDeque::new(),
            max_retries,
        }
    }

    /// Restore a queue from persisted operations, in order.
    pub fn from_vec(ops: Vec<QueuedOperation>, max_retries: u32) -> Self {
        Self {
            ops: ops.into(),
            max_retries,
        }
    }

    /// Append `op` with a fresh retry count, replacing any older op for the same key.
    pub fn enqueue(&mut self, mut op: QueuedOperation) {
        op.retry_count = 0;
        self.push(op);
    }

    /// Queue `op` after its first remote attempt failed.
    ///
    /// That attempt counts towards the retry cap; with a cap of zero the
    /// operation is not queued and the permanent failure is returned instead.
    pub fn enqueue_failed(
        &mut self,
        op: QueuedOperation,
        error: &SyncError,
    ) -> Option<PermanentFailure> {
        let mut op = op.with_error(error.to_string());
        op.retry_count = 1;
        if op.retry_count > self.max_retries {
            self.ops.retain(|queued| queued.key != op.key);
            return Some(give_up(op, error));
        }
        self.push(op);
        None
    }

    fn push(&mut self, op: QueuedOperation) {
        let before = self.ops.len();
        self.ops.retain(|queued| queued.key != op.key);
        if self.ops.len() < before {
            tracing::debug!("Queued {} for '{}' supersedes older operation", op.kind.as_str(), op.key);
        }
        self.ops.push_back(op);
    }

    /// Attempt every queued operation in order.
    ///
    /// `retry_count` holds the failed attempts so far. A failure increments it
    /// and keeps the operation queued until it exceeds the retry cap; then the
    /// operation is removed and reported in [`DrainOutcome::permanent_failures`].
    pub async fn drain<F, Fut>(&mut self, mut apply: F) -> DrainOutcome
    where
        F: FnMut(QueuedOperation) -> Fut,
        Fut: Future<Output = SyncResult<Settled>>,
    {
        let mut outcome = DrainOutcome::default();
        let mut kept = VecDeque::with_capacity(self.ops.len());

        while let Some(mut op) = self.ops.pop_front() {
            match apply(op.clone()).await {
                Ok(Settled::Applied(remote_id)) => outcome.applied.push((op, remote_id)),
                Ok(Settled::Superseded) => outcome.superseded.push(op),
                Err(error) => {
                    op.retry_count = op.retry_count.saturating_add(1);
                    op.last_error = Some(error.to_string());
                    if op.retry_count > self.max_retries {
                        outcome.permanent_failures.push(give_up(op, &error));
                    } else {
                        kept.push_back(op);
                    }
                }
            }
        }

        self.ops = kept;
        outcome.retained = self.ops.len();
        outcome
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueuedOperation> {
        self.ops.iter()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.ops.iter().any(|op| op.key == key)
    }

    pub fn into_vec(self) -> Vec<QueuedOperation> {
        self.ops.into()
    }

    pub fn to_vec(&self) -> Vec<QueuedOperation> {
        self.ops.iter().cloned().collect()
    }
}

fn give_up(op: QueuedOperation, error: &SyncError) -> PermanentFailure {
    tracing::warn!(
        "Giving up on {} for '{}' after {} attempts: {error}",
        op.kind.as_str(),
        op.key,
        op.retry_count
    );
    PermanentFailure {
        key: op.key,
        kind: op.kind,
        attempts: op.retry_count,
        reason: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Entry;
    use pretty_assertions::assert_eq;

    fn upload(key: &str, updated_at: i64) -> QueuedOperation {
        QueuedOperation::upload(Entry::with_timestamps(key, "d", Vec::new(), 1, updated_at), 1)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_drain_empty_queue() {
        let mut queue = OfflineQueue::new(3);
        let outcome = queue.drain(|_| async { Ok(Settled::Applied(None)) }).await;
        assert_eq!(outcome, DrainOutcome::default());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_drain_applies_in_order() {
        let mut queue = OfflineQueue::new(3);
        queue.enqueue(upload("a", 1));
        queue.enqueue(QueuedOperation::delete("b", 2));

        let mut seen = Vec::new();
        let outcome = queue
            .drain(|op| {
                seen.push(op.key);
                async { Ok(Settled::Applied(None)) }
            })
            .await;

        assert_eq!(seen, vec!["a", "b"]);
        assert_eq!(outcome.applied.len(), 2);
        assert!(queue.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_enqueue_supersedes_same_key() {
        let mut queue = OfflineQueue::new(3);
        queue.enqueue(upload("a", 1));
        queue.enqueue(upload("b", 1));
        queue.enqueue(QueuedOperation::delete("a", 5));

        let kinds: Vec<_> = queue.iter().map(|op| (op.key.as_str(), op.kind)).collect();
        assert_eq!(
            kinds,
            vec![("b", OperationKind::Upload), ("a", OperationKind::Delete)]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failure_is_retained_with_count() {
        let mut queue = OfflineQueue::new(3);
        queue.enqueue(upload("a", 1));

        let outcome = queue
            .drain(|_| async { Err(SyncError::TransientRemoteFailure("HTTP 503".into())) })
            .await;

        assert_eq!(outcome.retained, 1);
        let op = queue.iter().next().unwrap();
        assert_eq!(op.retry_count, 1);
        assert!(op.last_error.as_deref().unwrap().contains("HTTP 503"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_retry_cap_surfaces_permanent_failure() {
        let max_retries = 2;
        let mut queue = OfflineQueue::new(max_retries);
        queue.enqueue(upload("a", 1));

        for _ in 0..max_retries {
            let outcome = queue
                .drain(|_| async { Err(SyncError::Timeout(std::time::Duration::from_secs(1))) })
                .await;
            assert!(outcome.permanent_failures.is_empty());
        }

        let outcome = queue
            .drain(|_| async { Err(SyncError::TransientRemoteFailure("still down".into())) })
            .await;

        assert!(queue.is_empty());
        assert_eq!(outcome.permanent_failures.len(), 1);
        let failure = &outcome.permanent_failures[0];
        assert_eq!(failure.key, "a");
        assert_eq!(failure.attempts, max_retries + 1);

        // Removed for good
        let outcome = queue.drain(|_| async { Ok(Settled::Applied(None)) }).await;
        assert!(outcome.applied.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_write_counts_towards_cap() {
        let error = SyncError::TransientRemoteFailure("HTTP 503".into());
        let mut queue = OfflineQueue::new(1);

        assert_eq!(queue.enqueue_failed(upload("a", 1), &error), None);
        let op = queue.iter().next().unwrap();
        assert_eq!(op.retry_count, 1);
        assert!(op.last_error.as_deref().unwrap().contains("HTTP 503"));

        // One retry allowed: the second failure in total is permanent
        let outcome = queue
            .drain(|_| async { Err(SyncError::TransientRemoteFailure("HTTP 503".into())) })
            .await;
        assert!(queue.is_empty());
        assert_eq!(outcome.permanent_failures.len(), 1);
        assert_eq!(outcome.permanent_failures[0].attempts, 2);
    }

    #[test]
    fn test_failed_write_without_retries_is_permanent() {
        let error = SyncError::TransientRemoteFailure("HTTP 503".into());
        let mut queue = OfflineQueue::new(0);
        queue.enqueue(upload("a", 1));

        let failure = queue.enqueue_failed(upload("a", 2), &error).unwrap();

        assert!(queue.is_empty());
        assert_eq!(failure.key, "a");
        assert_eq!(failure.kind, OperationKind::Upload);
        assert_eq!(failure.attempts, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_superseded_ops_are_dropped() {
        let mut queue = OfflineQueue::new(3);
        queue.enqueue(upload("a", 1));

        let outcome = queue.drain(|_| async { Ok(Settled::Superseded) }).await;

        assert_eq!(outcome.superseded.len(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_from_vec_keeps_retry_counts() {
        let mut op = upload("a", 1);
        op.retry_count = 4;
        let queue = OfflineQueue::from_vec(vec![op.clone()], 5);

        assert_eq!(queue.clone().into_vec(), vec![op]);
        assert!(queue.contains_key("a"));
    }
}
