//! Entry repository implementation

use libsql::{params, Connection, Row};

use super::{finish_transaction, optional_text, text_or_null};
use crate::error::Result;
use crate::models::{Entry, Snapshot};

const ENTRY_COLUMNS: &str =
    "key, description, examples, created_at, updated_at, remote_id, provenance";

/// Trait for entry storage operations (async)
#[allow(async_fn_in_trait)]
pub trait EntryRepository {
    /// Load every entry of a table
    async fn snapshot(&self, table: &str) -> Result<Snapshot>;

    /// Get one entry by key
    async fn get(&self, table: &str, key: &str) -> Result<Option<Entry>>;

    /// Insert or replace one entry
    async fn upsert(&self, table: &str, entry: &Entry) -> Result<()>;

    /// Remove one entry, returning whether it existed
    async fn remove(&self, table: &str, key: &str) -> Result<bool>;

    /// Replace the whole table with `snapshot` in one transaction
    async fn replace_all(&self, table: &str, snapshot: &Snapshot) -> Result<()>;

    /// Record remote ids returned by uploads
    async fn set_remote_ids(&self, table: &str, ids: &[(String, String)]) -> Result<()>;

    /// Tables that hold entries or bookkeeping
    async fn list_tables(&self) -> Result<Vec<String>>;
}

/// libSQL implementation of `EntryRepository`
pub struct LibSqlEntryRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlEntryRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse an entry from a database row
    fn parse_entry(row: &Row) -> Result<Entry> {
        let examples: String = row.get(2)?;
        let provenance: String = row.get(6)?;
        Ok(Entry {
            key: row.get(0)?,
            description: row.get(1)?,
            examples: serde_json::from_str(&examples)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
            remote_id: optional_text(row, 5)?,
            provenance: provenance.parse()?,
        })
    }

    async fn insert_entry(&self, table: &str, entry: &Entry) -> Result<()> {
        let examples = serde_json::to_string(&entry.examples)?;
        self.conn
            .execute(
                "INSERT OR REPLACE INTO entries
                    (table_id, key, description, examples, created_at, updated_at, remote_id, provenance)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    table,
                    entry.key.as_str(),
                    entry.description.as_str(),
                    examples,
                    entry.created_at,
                    entry.updated_at,
                    text_or_null(entry.remote_id.as_deref()),
                    entry.provenance.as_str()
                ],
            )
            .await?;
        Ok(())
    }

    async fn replace_all_inner(&self, table: &str, snapshot: &Snapshot) -> Result<()> {
        self.conn
            .execute("DELETE FROM entries WHERE table_id = ?", [table])
            .await?;
        for entry in snapshot {
            self.insert_entry(table, entry).await?;
        }
        Ok(())
    }

    async fn set_remote_ids_inner(&self, table: &str, ids: &[(String, String)]) -> Result<()> {
        for (key, remote_id) in ids {
            self.conn
                .execute(
                    "UPDATE entries SET remote_id = ? WHERE table_id = ? AND key = ?",
                    params![remote_id.as_str(), table, key.as_str()],
                )
                .await?;
        }
        Ok(())
    }
}

impl EntryRepository for LibSqlEntryRepository<'_> {
    async fn snapshot(&self, table: &str) -> Result<Snapshot> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE table_id = ? ORDER BY key"),
                [table],
            )
            .await?;

        let mut snapshot = Snapshot::new();
        while let Some(row) = rows.next().await? {
            snapshot.insert(Self::parse_entry(&row)?);
        }
        Ok(snapshot)
    }

    async fn get(&self, table: &str, key: &str) -> Result<Option<Entry>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE table_id = ? AND key = ?"),
                [table, key],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_entry(&row)?)),
            None => Ok(None),
        }
    }

    async fn upsert(&self, table: &str, entry: &Entry) -> Result<()> {
        self.insert_entry(table, entry).await
    }

    async fn remove(&self, table: &str, key: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute(
                "DELETE FROM entries WHERE table_id = ? AND key = ?",
                [table, key],
            )
            .await?;
        Ok(rows > 0)
    }

    async fn replace_all(&self, table: &str, snapshot: &Snapshot) -> Result<()> {
        self.conn.execute("BEGIN TRANSACTION", ()).await?;
        let result = self.replace_all_inner(table, snapshot).await;
        finish_transaction(self.conn, result).await
    }

    async fn set_remote_ids(&self, table: &str, ids: &[(String, String)]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.conn.execute("BEGIN TRANSACTION", ()).await?;
        let result = self.set_remote_ids_inner(table, ids).await;
        finish_transaction(self.conn, result).await
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT table_id FROM entries
                 UNION SELECT table_id FROM sync_state
                 UNION SELECT table_id FROM tombstones
                 UNION SELECT table_id FROM offline_queue
                 ORDER BY table_id",
                (),
            )
            .await?;

        let mut tables = Vec::new();
        while let Some(row) = rows.next().await? {
            tables.push(row.get::<String>(0)?);
        }
        Ok(tables)
    }
}
