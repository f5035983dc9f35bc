use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] lexi_core::Error),
    #[error(transparent)]
    Sync(#[from] lexi_core::SyncError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Entry key cannot be empty")]
    EmptyKey,
    #[error("No entry description provided")]
    EmptyDescription,
    #[error("Entry not found: {0}")]
    EntryNotFound(String),
    #[error("Entry already exists: {0} (use `lexi edit`)")]
    EntryExists(String),
    #[error("Nothing to change; pass --description, --example or --clear-examples")]
    NothingToEdit,
    #[error("Could not resolve a data directory; pass --db-path or set LEXI_DB_PATH")]
    NoDataDir,
    #[error("{0}")]
    SyncFailed(String),
}
