//! Local mutation tracking between sync cycles.

use std::collections::{BTreeSet, VecDeque};

use crate::models::{ChangeAction, ChangeRecord};

/// Ordered log of local mutations not yet confirmed by a sync cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeTracker {
    records: VecDeque<ChangeRecord>,
    capacity: usize,
}

impl ChangeTracker {
    /// Create an empty tracker keeping at most `capacity` records.
    pub const fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::new(),
            capacity,
        }
    }

    /// Restore a tracker from persisted records, oldest first.
    pub fn from_records(records: impl IntoIterator<Item = ChangeRecord>, capacity: usize) -> Self {
        let mut tracker = Self {
            records: records.into_iter().collect(),
            capacity,
        };
        tracker.enforce_capacity();
        tracker
    }

    /// Record a mutation, dropping the oldest records when full.
    pub fn record(&mut self, key: impl Into<String>, action: ChangeAction, at: i64) {
        self.records.push_back(ChangeRecord::new(key, action, at));
        self.enforce_capacity();
    }

    fn enforce_capacity(&mut self) {
        let mut dropped = 0usize;
        while self.records.len() > self.capacity {
            self.records.pop_front();
            dropped += 1;
        }
        if dropped > 0 {
            tracing::debug!("Change history full, dropped {dropped} oldest records");
        }
    }

    /// Pending records, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether any record is pending for `key`.
    pub fn is_pending(&self, key: &str) -> bool {
        self.records.iter().any(|record| record.key == key)
    }

    /// Most recent record for `key`.
    pub fn latest(&self, key: &str) -> Option<&ChangeRecord> {
        self.records.iter().rev().find(|record| record.key == key)
    }

    /// Distinct keys with pending records.
    pub fn pending_keys(&self) -> BTreeSet<&str> {
        self.records.iter().map(|record| record.key.as_str()).collect()
    }

    /// Drop records for `keys` made at or before `up_to`.
    ///
    /// Records made after `up_to` belong to mutations the finished cycle did
    /// not see, so they stay pending.
    pub fn clear<'k>(&mut self, keys: impl IntoIterator<Item = &'k str>, up_to: i64) -> usize {
        let keys: BTreeSet<&str> = keys.into_iter().collect();
        let before = self.records.len();
        self.records
            .retain(|record| !(record.at <= up_to && keys.contains(record.key.as_str())));
        before - self.records.len()
    }

    /// Records in order, for persistence.
    pub fn to_vec(&self) -> Vec<ChangeRecord> {
        self.records.iter().cloned().collect()
    }
}

impl Default for ChangeTracker {
    fn default() -> Self {
        Self::new(super::config::DEFAULT_CHANGE_HISTORY_CAP)
    }
}
