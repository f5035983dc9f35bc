//! Shared cross-platform state types.

use serde::Serialize;

/// Phase of the sync cycle of one table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    #[default]
    Idle,
    Fetching,
    Merging,
    Applying,
    Done,
    Failed,
}

impl CyclePhase {
    /// Whether a cycle is running.
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Fetching | Self::Merging | Self::Applying)
    }
}
