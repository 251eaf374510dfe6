//! SQLite-backed user mirror.
//!
//! One process-wide r2d2 pool is opened at startup; every operation checks a
//! connection out for its own duration. Dropping the [`UserStore`] releases
//! the pool.

mod events;
mod outbox;
mod users;

pub use outbox::{MirrorOp, MirrorWrite, PendingSync};

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT,
    role TEXT NOT NULL DEFAULT 'USER' CHECK (role IN ('USER', 'MODERATOR', 'ADMIN')),
    status TEXT NOT NULL DEFAULT 'ACTIVE' CHECK (status IN ('ACTIVE', 'BLOCKED')),
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);

CREATE TABLE IF NOT EXISTS webhook_events (
    delivery_id TEXT PRIMARY KEY,
    event_type TEXT NOT NULL,
    received_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_webhook_events_received_at ON webhook_events(received_at);

CREATE TABLE IF NOT EXISTS sync_outbox (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    op TEXT NOT NULL CHECK (op IN ('set_status', 'delete')),
    status TEXT CHECK (status IS NULL OR status IN ('ACTIVE', 'BLOCKED')),
    attempts INTEGER NOT NULL DEFAULT 0,
    last_error TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sync_outbox_created_at ON sync_outbox(created_at);
";

/// User mirror, webhook delivery ledger and sync outbox.
pub struct UserStore {
    pool: Pool<SqliteConnectionManager>,
}

impl UserStore {
    pub fn new(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        // Parse sqlite: prefix if present
        let path = database_url.strip_prefix("sqlite:").unwrap_or(database_url);

        let pool = if is_memory(path) {
            // Every in-memory connection is its own database, so pin exactly one.
            Pool::builder()
                .max_size(1)
                .min_idle(Some(1))
                .idle_timeout(None)
                .max_lifetime(None)
                .build(SqliteConnectionManager::memory())?
        } else {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }

            let manager = SqliteConnectionManager::file(path).with_init(|conn| {
                conn.busy_timeout(Duration::from_secs(5))?;
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                    row.get::<_, String>(0)
                })?;
                Ok(())
            });

            Pool::builder()
                .max_size(max_connections)
                .connection_timeout(Duration::from_secs(5))
                .build(manager)?
        };

        pool.get()?.execute_batch(SCHEMA)?;

        tracing::info!("User store initialized with database: {}", path);

        Ok(Self { pool })
    }

    pub(crate) fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StoreError> {
        Ok(self.pool.get()?)
    }
}

fn is_memory(path: &str) -> bool {
    matches!(path, ":memory:" | "memory" | "")
}

/// Fixed-width UTC timestamps so that text ordering matches time ordering.
fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_column<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_memory_store_keeps_schema() {
        let store = UserStore::new(":memory:", 4).unwrap();
        let conn = store.conn().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('users', 'webhook_events', 'sync_outbox')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 3);
    }

    #[test]
    fn test_file_store_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("mirror.db");
        let url = format!("sqlite:{}", path.display());

        let store = UserStore::new(&url, 2).unwrap();
        drop(store);
        assert!(path.exists());

        // Reopening an existing database is fine.
        UserStore::new(&url, 2).unwrap();
    }

    #[test]
    fn test_timestamp_roundtrip_is_ordered() {
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let late = early + chrono::Duration::milliseconds(1500);
        assert!(timestamp(&early) < timestamp(&late));
        assert_eq!(parse_timestamp(0, &timestamp(&late)).unwrap(), late);
    }

    #[test]
    fn test_schema_rejects_unknown_role() {
        let store = UserStore::new(":memory:", 1).unwrap();
        let conn = store.conn().unwrap();
        let result = conn.execute(
            "INSERT INTO users (id, email, role, status, created_at) VALUES ('u', 'e', 'OWNER', 'ACTIVE', '2024-01-01T00:00:00Z')",
            [],
        );
        assert!(result.is_err());
    }
}
