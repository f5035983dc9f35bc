//! Sync cycle results.

use serde::Serialize;

use super::queue::PermanentFailure;
use crate::util::now_millis;

/// Terminal status of a sync request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    /// Both stores reconciled.
    Done,
    /// Local-only cycle; the remote store was not reached.
    Skipped,
    /// Another cycle of the same table was already running.
    InProgress,
    /// Cancelled while fetching; nothing was written.
    Cancelled,
    /// A local store failure aborted the cycle.
    Failed,
}

impl CycleStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::Skipped => "skipped",
            Self::InProgress => "in_progress",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

/// Summary of one sync request, published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub table: String,
    pub status: CycleStatus,
    pub success: bool,
    pub skipped: bool,
    pub local_count: usize,
    pub remote_count: usize,
    pub merged_count: usize,
    pub conflicts_resolved: usize,
    pub queued_for_retry: usize,
    pub permanent_failures: Vec<PermanentFailure>,
    /// Some writes landed before the cycle failed.
    pub partially_applied: bool,
    pub error: Option<String>,
    pub finished_at: i64,
}

impl SyncReport {
    pub(crate) fn new(table: &str, status: CycleStatus) -> Self {
        Self {
            table: table.to_string(),
            status,
            success: matches!(status, CycleStatus::Done | CycleStatus::Skipped),
            skipped: status == CycleStatus::Skipped,
            local_count: 0,
            remote_count: 0,
            merged_count: 0,
            conflicts_resolved: 0,
            queued_for_retry: 0,
            permanent_failures: Vec::new(),
            partially_applied: false,
            error: None,
            finished_at: now_millis(),
        }
    }

    pub(crate) fn failed(table: &str, error: String, partially_applied: bool) -> Self {
        Self {
            partially_applied,
            error: Some(error),
            ..Self::new(table, CycleStatus::Failed)
        }
    }

    /// One-line human readable summary.
    pub fn summary(&self) -> String {
        match self.status {
            CycleStatus::InProgress => format!("{}: sync already in progress", self.table),
            CycleStatus::Cancelled => format!("{}: sync cancelled", self.table),
            CycleStatus::Failed => format!(
                "{}: sync failed: {}",
                self.table,
                self.error.as_deref().unwrap_or("unknown error")
            ),
            CycleStatus::Done | CycleStatus::Skipped => {
                let mut line = format!(
                    "{}: {} entries ({} local, {} remote), {} conflicts resolved, {} queued for retry",
                    self.table,
                    self.merged_count,
                    self.local_count,
                    self.remote_count,
                    self.conflicts_resolved,
                    self.queued_for_retry
                );
                if self.skipped {
                    line.push_str(", remote skipped");
                }
                if let Some(error) = &self.error {
                    line.push_str(&format!(" ({error})"));
                }
                if !self.permanent_failures.is_empty() {
                    line.push_str(&format!(
                        ", {} permanently failed",
                        self.permanent_failures.len()
                    ));
                }
                line
            }
        }
    }
}
