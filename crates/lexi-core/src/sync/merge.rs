//! Snapshot reconciliation.
//!
//! [`merge`] is pure: it never touches a store, never mutates its inputs and
//! returns the same result for the same arguments.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::models::{ConflictStrategy, Entry, Provenance, Snapshot};

/// Outcome of reconciling a local and a remote snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeResult {
    /// Reconciled snapshot.
    pub snapshot: Snapshot,
    /// Keys present on both sides that differed. Under the fixed-side
    /// strategies only differing values count.
    pub conflicts_resolved: usize,
    /// Keys present on both sides with identical content.
    pub unchanged: usize,
    /// Keys whose merged value must be written to the remote store.
    pub to_upload: Vec<String>,
    /// Keys whose merged value came from the remote store.
    pub to_download: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Local,
    Remote,
}

/// Reconcile `local` and `remote` under `strategy`.
pub fn merge(local: &Snapshot, remote: &Snapshot, strategy: ConflictStrategy) -> MergeResult {
    let keys: BTreeSet<&str> = local.keys().chain(remote.keys()).collect();
    let mut result = MergeResult::default();

    for key in keys {
        match (local.get(key), remote.get(key)) {
            (Some(local_entry), None) => {
                let mut entry = local_entry.clone();
                entry.provenance = Provenance::Local;
                result.to_upload.push(key.to_string());
                result.snapshot.insert(entry);
            }
            (None, Some(remote_entry)) => {
                let mut entry = remote_entry.clone();
                entry.provenance = Provenance::Remote;
                result.to_download.push(key.to_string());
                result.snapshot.insert(entry);
            }
            (Some(local_entry), Some(remote_entry)) => {
                if local_entry.is_identical(remote_entry) {
                    let mut entry = local_entry.clone();
                    if entry.remote_id.is_none() {
                        entry.remote_id.clone_from(&remote_entry.remote_id);
                    }
                    result.unchanged += 1;
                    result.snapshot.insert(entry);
                    continue;
                }

                let side = pick_winner(local_entry, remote_entry, strategy);
                let mut entry = match side {
                    Side::Local => {
                        result.to_upload.push(key.to_string());
                        local_entry.clone()
                    }
                    Side::Remote => {
                        result.to_download.push(key.to_string());
                        remote_entry.clone()
                    }
                };
                entry.remote_id = remote_entry
                    .remote_id
                    .clone()
                    .or_else(|| local_entry.remote_id.clone());
                entry.provenance = Provenance::Merged;
                // Fixed-side strategies only count a real disagreement in value
                let counted = strategy == ConflictStrategy::MostRecent
                    || !local_entry.same_value(remote_entry);
                if counted {
                    result.conflicts_resolved += 1;
                }
                result.snapshot.insert(entry);
            }
            (None, None) => {}
        }
    }

    result
}

fn pick_winner(local: &Entry, remote: &Entry, strategy: ConflictStrategy) -> Side {
    match strategy {
        ConflictStrategy::PreferLocal => Side::Local,
        ConflictStrategy::PreferRemote => Side::Remote,
        ConflictStrategy::MostRecent => match local.updated_at.cmp(&remote.updated_at) {
            Ordering::Greater => Side::Local,
            Ordering::Less => Side::Remote,
            // Equal timestamps: larger content wins so either argument order agrees
            Ordering::Equal => match local.content_cmp(remote) {
                Ordering::Greater => Side::Local,
                Ordering::Less | Ordering::Equal => Side::Remote,
            },
        },
    }
}
