use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use super::{timestamp, StoreError, UserStore};

impl UserStore {
    /// Whether a webhook delivery with this id was already applied.
    pub fn is_event_processed(&self, delivery_id: &str) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM webhook_events WHERE delivery_id = ?1",
                params![delivery_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Remember an applied webhook delivery.
    pub fn record_event(&self, delivery_id: &str, event_type: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO webhook_events (delivery_id, event_type, received_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(delivery_id) DO NOTHING",
            params![delivery_id, event_type, timestamp(&Utc::now())],
        )?;
        Ok(())
    }

    /// Forget deliveries recorded before `cutoff`. Returns how many were removed.
    pub fn prune_events(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM webhook_events WHERE received_at < ?1",
            params![timestamp(&cutoff)],
        )?;
        Ok(removed)
    }
}
