//! Snapshot model

use std::collections::btree_map;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::entry::{Entry, Provenance};
use super::sync_state::ProvenanceCounts;

/// Full state of one table as held by one store at one instant.
///
/// Keys are unique; iteration is ordered by key so merges are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    entries: BTreeMap<String, Entry>,
}

impl Snapshot {
    /// Create an empty snapshot
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from entries. Later duplicates replace earlier ones.
    pub fn from_entries(entries: impl IntoIterator<Item = Entry>) -> Self {
        entries.into_iter().collect()
    }

    /// Look up an entry by key
    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    /// Check whether a key is present
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or replace an entry, returning the previous value
    pub fn insert(&mut self, entry: Entry) -> Option<Entry> {
        self.entries.insert(entry.key.clone(), entry)
    }

    /// Remove an entry by key
    pub fn remove(&mut self, key: &str) -> Option<Entry> {
        self.entries.remove(key)
    }

    /// Mutable access to one entry
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Entry> {
        self.entries.get_mut(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries in key order
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    /// Count entries by provenance
    pub fn provenance_counts(&self) -> ProvenanceCounts {
        let mut counts = ProvenanceCounts::default();
        for entry in self.entries.values() {
            match entry.provenance {
                Provenance::Local => counts.local += 1,
                Provenance::Remote => counts.remote += 1,
                Provenance::Merged => counts.merged += 1,
            }
        }
        counts
    }

    /// Equality of keys, values and timestamps, ignoring provenance and remote ids.
    pub fn same_content(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.entries.iter().all(|(key, entry)| {
                other.get(key).is_some_and(|theirs| {
                    entry.is_identical(theirs) && entry.created_at == theirs.created_at
                })
            })
    }
}

impl FromIterator<Entry> for Snapshot {
    fn from_iter<I: IntoIterator<Item = Entry>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|entry| (entry.key.clone(), entry))
                .collect(),
        }
    }
}

impl IntoIterator for Snapshot {
    type Item = Entry;
    type IntoIter = btree_map::IntoValues<String, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a Entry;
    type IntoIter = btree_map::Values<'a, String, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}
