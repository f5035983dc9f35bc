//! Data models for Lexi

mod change;
mod entry;
mod operation;
mod snapshot;
mod sync_state;

pub use change::{ChangeAction, ChangeRecord, Tombstone};
pub use entry::{validate_key, Entry, Provenance, MAX_KEY_LEN};
pub use operation::{OperationId, OperationKind, QueuedOperation};
pub use snapshot::Snapshot;
pub use sync_state::{ConflictStrategy, ProvenanceCounts, SyncState};
