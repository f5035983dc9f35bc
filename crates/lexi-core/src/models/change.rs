//! Local change log and tombstone models

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Kind of local mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    /// Entry was created
    Created,
    /// Entry was edited
    Updated,
    /// Entry was deleted
    Deleted,
}

impl ChangeAction {
    /// Stable string form used for persistence.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }
}

impl FromStr for ChangeAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "created" => Ok(Self::Created),
            "updated" => Ok(Self::Updated),
            "deleted" => Ok(Self::Deleted),
            other => Err(Error::InvalidInput(format!("unknown change action '{other}'"))),
        }
    }
}

/// One local mutation since the last successful sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Entry key
    pub key: String,
    /// What happened
    pub action: ChangeAction,
    /// When it happened (Unix ms)
    pub at: i64,
}

impl ChangeRecord {
    /// Create a change record
    pub fn new(key: impl Into<String>, action: ChangeAction, at: i64) -> Self {
        Self {
            key: key.into(),
            action,
            at,
        }
    }
}

/// Marker for a locally deleted key that still has to reach the remote store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tombstone {
    /// Deleted key
    pub key: String,
    /// Deletion time (Unix ms)
    pub deleted_at: i64,
    /// Remote id of the deleted entry, when it had been uploaded
    pub remote_id: Option<String>,
}
