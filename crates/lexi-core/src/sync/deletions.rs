//! Deletion reconciliation, run before the merge.
//!
//! The merge only sees present entries, so a key missing on one side looks
//! like a new entry on the other. This pass removes keys that were deleted
//! on purpose from the views the merge receives.

use crate::models::{Snapshot, Tombstone};

use super::tracker::ChangeTracker;

/// Views to merge plus the deletions they imply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionPlan {
    /// Local view with remote-side deletions applied.
    pub local: Snapshot,
    /// Remote view with local deletions applied.
    pub remote: Snapshot,
    /// Keys to delete from the remote store.
    pub remote_deletes: Vec<String>,
    /// Keys deleted on another device and removed locally.
    pub local_removals: Vec<String>,
    /// Tombstones that no longer need propagating.
    pub resolved_tombstones: Vec<String>,
}

/// Plan deletions for one cycle.
///
/// `last_remote_sync_at` is the last time the remote store was reached. A
/// local entry with a remote id that the remote no longer holds counts as
/// deleted elsewhere only when it has no pending local change and was not
/// edited after that time; otherwise the local edit wins and is re-uploaded.
pub fn reconcile_deletions(
    local: &Snapshot,
    remote: &Snapshot,
    tombstones: &[Tombstone],
    tracker: &ChangeTracker,
    last_remote_sync_at: Option<i64>,
) -> DeletionPlan {
    let mut plan = DeletionPlan {
        local: local.clone(),
        remote: remote.clone(),
        ..DeletionPlan::default()
    };

    for tombstone in tombstones {
        let key = tombstone.key.as_str();
        if local.contains(key) {
            // Recreated locally after the delete
            plan.resolved_tombstones.push(key.to_string());
            continue;
        }
        match remote.get(key) {
            Some(remote_entry) if remote_entry.updated_at > tombstone.deleted_at => {
                tracing::debug!("Remote edit of '{key}' outlives local delete");
                plan.resolved_tombstones.push(key.to_string());
            }
            Some(_) => {
                plan.remote.remove(key);
                plan.remote_deletes.push(key.to_string());
            }
            None => plan.resolved_tombstones.push(key.to_string()),
        }
    }

    let Some(last_remote_sync_at) = last_remote_sync_at else {
        return plan;
    };

    for entry in local.entries() {
        if entry.remote_id.is_none() || remote.contains(&entry.key) {
            continue;
        }
        if tracker.is_pending(&entry.key) || entry.updated_at > last_remote_sync_at {
            continue;
        }
        tracing::debug!("'{}' was deleted remotely", entry.key);
        plan.local.remove(&entry.key);
        plan.local_removals.push(entry.key.clone());
    }

    plan
}
