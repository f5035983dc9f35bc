//! lexi-core - Core library for Lexi
//!
//! This crate contains the entry models, the libSQL local store, the remote
//! store adapters and the sync engine that keeps the two stores reconciled.
//! The CLI and any embedding app drive everything through
//! [`SyncOrchestrator`].

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod store;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{ConflictStrategy, Entry, Snapshot, SyncState};
pub use services::DatabaseService;
pub use store::{HttpRemoteStore, LocalStore, MemoryRemoteStore, RemoteStore};
pub use sync::{SyncConfig, SyncError, SyncOrchestrator, SyncReport};
