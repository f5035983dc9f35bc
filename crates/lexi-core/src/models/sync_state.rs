//! Persisted per-table sync bookkeeping

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How conflicting edits of the same key are resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStrategy {
    /// Later `updated_at` wins
    #[default]
    MostRecent,
    /// Remote value always wins
    PreferRemote,
    /// Local value always wins
    PreferLocal,
}

impl ConflictStrategy {
    /// Stable string form used for persistence and CLI flags.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MostRecent => "most_recent",
            Self::PreferRemote => "prefer_remote",
            Self::PreferLocal => "prefer_local",
        }
    }
}

impl fmt::Display for ConflictStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "most_recent" => Ok(Self::MostRecent),
            "prefer_remote" => Ok(Self::PreferRemote),
            "prefer_local" => Ok(Self::PreferLocal),
            other => Err(Error::InvalidInput(format!(
                "unknown conflict strategy '{other}'"
            ))),
        }
    }
}

/// Entry counts by provenance from the last cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceCounts {
    /// Entries whose value came from the local store
    pub local: usize,
    /// Entries whose value came from the remote store
    pub remote: usize,
    /// Entries produced by conflict resolution
    pub merged: usize,
}

impl ProvenanceCounts {
    /// Total number of entries counted
    pub const fn total(&self) -> usize {
        self.local + self.remote + self.merged
    }
}

/// Sync bookkeeping for one table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    /// Completion time of the last cycle, including local-only cycles (Unix ms)
    pub last_sync_at: Option<i64>,
    /// Completion time of the last cycle that reached the remote store (Unix ms)
    pub last_remote_sync_at: Option<i64>,
    /// Strategy used by the last cycle
    pub strategy: ConflictStrategy,
    /// Entry counts by provenance
    pub counts: ProvenanceCounts,
    /// Error message of the last failed or skipped cycle
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_parse_accepts_dashes_and_case() {
        assert_eq!(
            "Prefer-Remote".parse::<ConflictStrategy>().unwrap(),
            ConflictStrategy::PreferRemote
        );
        assert_eq!(
            "most_recent".parse::<ConflictStrategy>().unwrap(),
            ConflictStrategy::MostRecent
        );
        assert!("newest".parse::<ConflictStrategy>().is_err());
    }

    #[test]
    fn test_strategy_serde_uses_snake_case() {
        let json = serde_json::to_string(&ConflictStrategy::PreferLocal).unwrap();
        assert_eq!(json, "\"prefer_local\"");
    }

    #[test]
    fn test_sync_state_default() {
        let state = SyncState::default();
        assert!(state.last_sync_at.is_none());
        assert_eq!(state.strategy, ConflictStrategy::MostRecent);
        assert_eq!(state.counts.total(), 0);
    }
}
