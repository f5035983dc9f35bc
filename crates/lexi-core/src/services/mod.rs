//! Client-facing services.

mod database;

pub use database::DatabaseService;
