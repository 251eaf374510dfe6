//! Deferred mirror writes.
//!
//! Administrative mutations write the identity provider first and the mirror
//! second. When the second write fails the mutation is parked here and
//! replayed by the reconciler.

use chrono::{DateTime, Utc};
use mirrorgate_common::UserStatus;
use rusqlite::{params, Connection, Row};

use super::users::{write_delete, write_update};
use super::{parse_column, parse_timestamp, timestamp, StoreError, UserStore};
use crate::models::UserUpdate;

/// A mirror mutation that follows a confirmed provider mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorOp {
    SetStatus(UserStatus),
    Delete,
}

impl MirrorOp {
    fn kind(&self) -> &'static str {
        match self {
            MirrorOp::SetStatus(_) => "set_status",
            MirrorOp::Delete => "delete",
        }
    }

    fn status(&self) -> Option<&'static str> {
        match self {
            MirrorOp::SetStatus(status) => Some(status.as_str()),
            MirrorOp::Delete => None,
        }
    }
}

/// Result of [`UserStore::apply_or_defer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorWrite {
    /// Written now; the flag tells whether a record was affected.
    Applied(bool),
    /// Parked in the outbox under this id.
    Deferred(String),
}

/// An outbox entry.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSync {
    pub id: String,
    pub user_id: String,
    pub op: MirrorOp,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn row_to_pending(row: &Row<'_>) -> rusqlite::Result<PendingSync> {
    let kind: String = row.get(2)?;
    let status: Option<String> = row.get(3)?;
    let op = match (kind.as_str(), status) {
        ("delete", _) => MirrorOp::Delete,
        (_, Some(status)) => MirrorOp::SetStatus(parse_column(3, &status)?),
        (_, None) => {
            return Err(rusqlite::Error::InvalidColumnType(
                3,
                "status".to_string(),
                rusqlite::types::Type::Null,
            ))
        }
    };
    let created_at: String = row.get(6)?;

    Ok(PendingSync {
        id: row.get(0)?,
        user_id: row.get(1)?,
        op,
        attempts: row.get::<_, i64>(4)?.max(0) as u32,
        last_error: row.get(5)?,
        created_at: parse_timestamp(6, &created_at)?,
    })
}

/// Drop every outbox entry for `user_id`.
pub(super) fn clear_pending(conn: &Connection, user_id: &str) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM sync_outbox WHERE user_id = ?1", params![user_id])
}

fn write_op(conn: &Connection, user_id: &str, op: MirrorOp) -> rusqlite::Result<bool> {
    match op {
        MirrorOp::SetStatus(status) => write_update(
            conn,
            user_id,
            &UserUpdate {
                status: Some(status),
                ..Default::default()
            },
        ),
        MirrorOp::Delete => write_delete(conn, user_id),
    }
}

impl UserStore {
    /// Apply a mirror mutation. Returns whether a record was affected.
    ///
    /// Pending outbox entries for the user are dropped with the write.
    pub fn apply_op(&self, user_id: &str, op: MirrorOp) -> Result<bool, StoreError> {
        match op {
            MirrorOp::SetStatus(status) => self.set_status(user_id, status),
            MirrorOp::Delete => self.delete_user(user_id),
        }
    }

    /// Apply a mirror mutation, parking it in the outbox if the write fails.
    ///
    /// Only an outbox failure is returned as an error.
    pub fn apply_or_defer(&self, user_id: &str, op: MirrorOp) -> Result<MirrorWrite, StoreError> {
        match self.apply_op(user_id, op) {
            Ok(affected) => Ok(MirrorWrite::Applied(affected)),
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    op = op.kind(),
                    "Mirror write failed, deferring to outbox: {}",
                    e
                );
                let entry = self.enqueue_sync(user_id, op, Some(&e.to_string()))?;
                Ok(MirrorWrite::Deferred(entry.id))
            }
        }
    }

    pub fn enqueue_sync(
        &self,
        user_id: &str,
        op: MirrorOp,
        error: Option<&str>,
    ) -> Result<PendingSync, StoreError> {
        let entry = PendingSync {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            op,
            attempts: 0,
            last_error: error.map(String::from),
            created_at: Utc::now(),
        };

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sync_outbox (id, user_id, op, status, attempts, last_error, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6)",
            params![
                entry.id,
                entry.user_id,
                op.kind(),
                op.status(),
                entry.last_error,
                timestamp(&entry.created_at),
            ],
        )?;

        Ok(entry)
    }

    /// Oldest outbox entries first.
    pub fn pending_syncs(&self, limit: u32) -> Result<Vec<PendingSync>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, op, status, attempts, last_error, created_at
             FROM sync_outbox ORDER BY created_at, id LIMIT ?1",
        )?;
        let entries = stmt
            .query_map(params![limit], row_to_pending)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn pending_count(&self) -> Result<u64, StoreError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sync_outbox", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Apply a parked entry and retire it together with every older entry for
    /// the same user. Entries queued after it stay pending.
    ///
    /// Returns the number of entries retired.
    pub fn replay_sync(&self, entry: &PendingSync) -> Result<usize, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        write_op(&tx, &entry.user_id, entry.op)?;
        let retired = tx.execute(
            "DELETE FROM sync_outbox
             WHERE user_id = ?1 AND (created_at < ?2 OR (created_at = ?2 AND id <= ?3))",
            params![entry.user_id, timestamp(&entry.created_at), entry.id],
        )?;
        tx.commit()?;
        Ok(retired)
    }

    pub fn fail_sync(&self, id: &str, error: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE sync_outbox SET attempts = attempts + 1, last_error = ?1 WHERE id = ?2",
            params![error, id],
        )?;
        Ok(())
    }
}
