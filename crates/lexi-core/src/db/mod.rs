//! Database layer for Lexi

mod bookkeeping_repository;
mod connection;
mod entry_repository;
mod migrations;

pub use bookkeeping_repository::{BookkeepingRepository, LibSqlBookkeepingRepository};
pub use connection::Database;
pub use entry_repository::{EntryRepository, LibSqlEntryRepository};

use libsql::{Connection, Row, Value};

use crate::error::{Error, Result};

/// Commit when `result` is `Ok`, roll back otherwise.
async fn finish_transaction(conn: &Connection, result: Result<()>) -> Result<()> {
    match result {
        Ok(()) => {
            if let Err(e) = conn.execute("COMMIT", ()).await {
                conn.execute("ROLLBACK", ()).await.ok();
                return Err(e.into());
            }
            Ok(())
        }
        Err(error) => {
            conn.execute("ROLLBACK", ()).await.ok();
            Err(error)
        }
    }
}

fn text_or_null(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |text| Value::Text(text.to_string()))
}

fn int_or_null(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}

fn optional_text(row: &Row, idx: i32) -> Result<Option<String>> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Text(text) => Ok(Some(text)),
        other => Err(Error::Database(format!(
            "expected TEXT or NULL in column {idx}, found {other:?}"
        ))),
    }
}

fn optional_int(row: &Row, idx: i32) -> Result<Option<i64>> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Integer(value) => Ok(Some(value)),
        other => Err(Error::Database(format!(
            "expected INTEGER or NULL in column {idx}, found {other:?}"
        ))),
    }
}
