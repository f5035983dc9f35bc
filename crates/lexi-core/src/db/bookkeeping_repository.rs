//! Sync bookkeeping repository: sync state, tombstones, change log, offline queue

use libsql::{params, Connection, Row};

use super::{finish_transaction, int_or_null, optional_int, optional_text, text_or_null};
use crate::error::{Error, Result};
use crate::models::{
    ChangeRecord, ProvenanceCounts, QueuedOperation, SyncState, Tombstone,
};

/// Trait for sync bookkeeping storage operations (async)
#[allow(async_fn_in_trait)]
pub trait BookkeepingRepository {
    /// Load the sync state of a table, if any cycle has run
    async fn load_sync_state(&self, table: &str) -> Result<Option<SyncState>>;

    /// Save the sync state of a table
    async fn save_sync_state(&self, table: &str, state: &SyncState) -> Result<()>;

    /// Load tombstones of a table
    async fn load_tombstones(&self, table: &str) -> Result<Vec<Tombstone>>;

    /// Replace tombstones of a table
    async fn save_tombstones(&self, table: &str, tombstones: &[Tombstone]) -> Result<()>;

    /// Load the change log of a table, oldest first
    async fn load_changes(&self, table: &str) -> Result<Vec<ChangeRecord>>;

    /// Replace the change log of a table
    async fn save_changes(&self, table: &str, changes: &[ChangeRecord]) -> Result<()>;

    /// Load the offline queue of a table, in order
    async fn load_queue(&self, table: &str) -> Result<Vec<QueuedOperation>>;

    /// Replace the offline queue of a table
    async fn save_queue(&self, table: &str, queue: &[QueuedOperation]) -> Result<()>;
}

/// libSQL implementation of `BookkeepingRepository`
pub struct LibSqlBookkeepingRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlBookkeepingRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_sync_state(row: &Row) -> Result<SyncState> {
        let strategy: String = row.get(2)?;
        Ok(SyncState {
            last_sync_at: optional_int(row, 0)?,
            last_remote_sync_at: optional_int(row, 1)?,
            strategy: strategy.parse()?,
            counts: ProvenanceCounts {
                local: to_count(row.get(3)?),
                remote: to_count(row.get(4)?),
                merged: to_count(row.get(5)?),
            },
            last_error: optional_text(row, 6)?,
        })
    }

    fn parse_operation(row: &Row) -> Result<QueuedOperation> {
        let id: String = row.get(0)?;
        let kind: String = row.get(1)?;
        let payload = optional_text(row, 3)?
            .map(|payload| serde_json::from_str(&payload))
            .transpose()?;
        let retry_count: i64 = row.get(5)?;

        Ok(QueuedOperation {
            id: id
                .parse()
                .map_err(|_| Error::Database(format!("invalid queued operation id '{id}'")))?,
            kind: kind.parse()?,
            key: row.get(2)?,
            payload,
            enqueued_at: row.get(4)?,
            retry_count: u32::try_from(retry_count).unwrap_or(u32::MAX),
            last_error: optional_text(row, 6)?,
        })
    }

    async fn save_tombstones_inner(&self, table: &str, tombstones: &[Tombstone]) -> Result<()> {
        self.conn
            .execute("DELETE FROM tombstones WHERE table_id = ?", [table])
            .await?;
        for tombstone in tombstones {
            self.conn
                .execute(
                    "INSERT OR REPLACE INTO tombstones (table_id, key, deleted_at, remote_id)
                     VALUES (?, ?, ?, ?)",
                    params![
                        table,
                        tombstone.key.as_str(),
                        tombstone.deleted_at,
                        text_or_null(tombstone.remote_id.as_deref())
                    ],
                )
                .await?;
        }
        Ok(())
    }

    async fn save_changes_inner(&self, table: &str, changes: &[ChangeRecord]) -> Result<()> {
        self.conn
            .execute("DELETE FROM change_log WHERE table_id = ?", [table])
            .await?;
        for change in changes {
            self.conn
                .execute(
                    "INSERT INTO change_log (table_id, key, action, at) VALUES (?, ?, ?, ?)",
                    params![table, change.key.as_str(), change.action.as_str(), change.at],
                )
                .await?;
        }
        Ok(())
    }

    async fn save_queue_inner(&self, table: &str, queue: &[QueuedOperation]) -> Result<()> {
        self.conn
            .execute("DELETE FROM offline_queue WHERE table_id = ?", [table])
            .await?;
        for (position, op) in queue.iter().enumerate() {
            let payload = op
                .payload
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;
            self.conn
                .execute(
                    "INSERT INTO offline_queue
                        (id, table_id, position, kind, key, payload, enqueued_at, retry_count, last_error)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    params![
                        op.id.to_string(),
                        table,
                        i64::try_from(position).unwrap_or(i64::MAX),
                        op.kind.as_str(),
                        op.key.as_str(),
                        text_or_null(payload.as_deref()),
                        op.enqueued_at,
                        i64::from(op.retry_count),
                        text_or_null(op.last_error.as_deref())
                    ],
                )
                .await?;
        }
        Ok(())
    }
}

impl BookkeepingRepository for LibSqlBookkeepingRepository<'_> {
    async fn load_sync_state(&self, table: &str) -> Result<Option<SyncState>> {
        let mut rows = self
            .conn
            .query(
                "SELECT last_sync_at, last_remote_sync_at, strategy,
                        local_count, remote_count, merged_count, last_error
                 FROM sync_state WHERE table_id = ?",
                [table],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_sync_state(&row)?)),
            None => Ok(None),
        }
    }

    async fn save_sync_state(&self, table: &str, state: &SyncState) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO sync_state
                    (table_id, last_sync_at, last_remote_sync_at, strategy,
                     local_count, remote_count, merged_count, last_error)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    table,
                    int_or_null(state.last_sync_at),
                    int_or_null(state.last_remote_sync_at),
                    state.strategy.as_str(),
                    from_count(state.counts.local),
                    from_count(state.counts.remote),
                    from_count(state.counts.merged),
                    text_or_null(state.last_error.as_deref())
                ],
            )
            .await?;
        Ok(())
    }

    async fn load_tombstones(&self, table: &str) -> Result<Vec<Tombstone>> {
        let mut rows = self
            .conn
            .query(
                "SELECT key, deleted_at, remote_id FROM tombstones
                 WHERE table_id = ? ORDER BY deleted_at, key",
                [table],
            )
            .await?;

        let mut tombstones = Vec::new();
        while let Some(row) = rows.next().await? {
            tombstones.push(Tombstone {
                key: row.get(0)?,
                deleted_at: row.get(1)?,
                remote_id: optional_text(&row, 2)?,
            });
        }
        Ok(tombstones)
    }

    async fn save_tombstones(&self, table: &str, tombstones: &[Tombstone]) -> Result<()> {
        self.conn.execute("BEGIN TRANSACTION", ()).await?;
        let result = self.save_tombstones_inner(table, tombstones).await;
        finish_transaction(self.conn, result).await
    }

    async fn load_changes(&self, table: &str) -> Result<Vec<ChangeRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT key, action, at FROM change_log WHERE table_id = ? ORDER BY id",
                [table],
            )
            .await?;

        let mut changes = Vec::new();
        while let Some(row) = rows.next().await? {
            let action: String = row.get(1)?;
            changes.push(ChangeRecord {
                key: row.get(0)?,
                action: action.parse()?,
                at: row.get(2)?,
            });
        }
        Ok(changes)
    }

    async fn save_changes(&self, table: &str, changes: &[ChangeRecord]) -> Result<()> {
        self.conn.execute("BEGIN TRANSACTION", ()).await?;
        let result = self.save_changes_inner(table, changes).await;
        finish_transaction(self.conn, result).await
    }

    async fn load_queue(&self, table: &str) -> Result<Vec<QueuedOperation>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, kind, key, payload, enqueued_at, retry_count, last_error
                 FROM offline_queue WHERE table_id = ? ORDER BY position",
                [table],
            )
            .await?;

        let mut queue = Vec::new();
        while let Some(row) = rows.next().await? {
            queue.push(Self::parse_operation(&row)?);
        }
        Ok(queue)
    }

    async fn save_queue(&self, table: &str, queue: &[QueuedOperation]) -> Result<()> {
        self.conn.execute("BEGIN TRANSACTION", ()).await?;
        let result = self.save_queue_inner(table, queue).await;
        finish_transaction(self.conn, result).await
    }
}

fn to_count(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}

fn from_count(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
