//! Queued remote operation model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::entry::Entry;
use crate::error::{Error, Result};

/// A unique identifier for a queued operation, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(Uuid);

impl OperationId {
    /// Create a new unique operation ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OperationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Kind of remote-bound operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Upsert the payload entry
    Upload,
    /// Delete the key
    Delete,
}

impl OperationKind {
    /// Stable string form used for persistence.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Delete => "delete",
        }
    }
}

impl FromStr for OperationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "upload" => Ok(Self::Upload),
            "delete" => Ok(Self::Delete),
            other => Err(Error::InvalidInput(format!("unknown operation kind '{other}'"))),
        }
    }
}

/// A remote write that could not be applied and waits for a later cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedOperation {
    /// Unique identifier
    pub id: OperationId,
    /// Upload or delete
    pub kind: OperationKind,
    /// Entry key the operation targets
    pub key: String,
    /// Entry to upload (uploads only)
    pub payload: Option<Entry>,
    /// When the operation was first queued (Unix ms)
    pub enqueued_at: i64,
    /// Failed attempts since the operation was queued
    pub retry_count: u32,
    /// Reason of the most recent failure
    pub last_error: Option<String>,
}

impl QueuedOperation {
    /// Queue an upload of `entry`
    #[must_use]
    pub fn upload(entry: Entry, enqueued_at: i64) -> Self {
        Self {
            id: OperationId::new(),
            kind: OperationKind::Upload,
            key: entry.key.clone(),
            payload: Some(entry),
            enqueued_at,
            retry_count: 0,
            last_error: None,
        }
    }

    /// Queue a deletion of `key`
    #[must_use]
    pub fn delete(key: impl Into<String>, enqueued_at: i64) -> Self {
        Self {
            id: OperationId::new(),
            kind: OperationKind::Delete,
            key: key.into(),
            payload: None,
            enqueued_at,
            retry_count: 0,
            last_error: None,
        }
    }

    /// Record an error as the reason for the last failure
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.last_error = Some(error.into());
        self
    }
}
