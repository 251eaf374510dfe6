use mirrorgate_common::{Role, UserStatus};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use super::outbox::clear_pending;
use super::{parse_column, parse_timestamp, timestamp, StoreError, UserStore};
use crate::models::{UserRecord, UserUpdate};

const USER_COLUMNS: &str = "id, email, role, status, created_at";

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    let role: String = row.get(2)?;
    let status: String = row.get(3)?;
    let created_at: String = row.get(4)?;

    Ok(UserRecord {
        id: row.get(0)?,
        email: row.get(1)?,
        role: parse_column(2, &role)?,
        status: parse_column(3, &status)?,
        created_at: parse_timestamp(4, &created_at)?,
    })
}

impl UserStore {
    /// Insert a mirror record. Returns `false` if a record with the same id
    /// already exists, in which case nothing is written.
    pub fn create_user(&self, user: &UserRecord) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT INTO users (id, email, role, status, created_at) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO NOTHING",
            params![
                user.id,
                user.email,
                user.role.as_str(),
                user.status.as_str(),
                timestamp(&user.created_at),
            ],
        )?;

        if inserted == 1 {
            tracing::debug!("Inserted mirror record {}", user.id);
        }
        Ok(inserted == 1)
    }

    pub fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
                params![user_id],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// All mirror records, newest first.
    pub fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users ORDER BY created_at DESC, id",
            USER_COLUMNS
        ))?;
        let users = stmt
            .query_map([], row_to_user)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    pub fn count_users(&self) -> Result<u64, StoreError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Apply the fields present in `update`. Returns `false` when no record
    /// has that id. An empty update touches nothing and returns `false`.
    ///
    /// A status change drops any outbox entries still pending for the user.
    pub fn update_user(&self, user_id: &str, update: &UserUpdate) -> Result<bool, StoreError> {
        if update.is_empty() {
            return Ok(false);
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let changed = write_update(&tx, user_id, update)?;
        if update.status.is_some() {
            clear_pending(&tx, user_id)?;
        }
        tx.commit()?;
        Ok(changed)
    }

    pub fn set_status(&self, user_id: &str, status: UserStatus) -> Result<bool, StoreError> {
        self.update_user(
            user_id,
            &UserUpdate {
                status: Some(status),
                ..Default::default()
            },
        )
    }

    pub fn set_role(&self, user_id: &str, role: Role) -> Result<bool, StoreError> {
        self.update_user(
            user_id,
            &UserUpdate {
                role: Some(role),
                ..Default::default()
            },
        )
    }

    /// Remove a mirror record and its pending outbox entries. Returns whether
    /// a record existed.
    pub fn delete_user(&self, user_id: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let deleted = write_delete(&tx, user_id)?;
        clear_pending(&tx, user_id)?;
        tx.commit()?;
        Ok(deleted)
    }
}

pub(super) fn write_update(
    conn: &Connection,
    user_id: &str,
    update: &UserUpdate,
) -> rusqlite::Result<bool> {
    let mut assignments = Vec::new();
    let mut values: Vec<String> = Vec::new();

    if let Some(ref email) = update.email {
        values.push(email.clone());
        assignments.push(format!("email = ?{}", values.len()));
    }
    if let Some(role) = update.role {
        values.push(role.as_str().to_string());
        assignments.push(format!("role = ?{}", values.len()));
    }
    if let Some(status) = update.status {
        values.push(status.as_str().to_string());
        assignments.push(format!("status = ?{}", values.len()));
    }

    if assignments.is_empty() {
        return Ok(false);
    }

    values.push(user_id.to_string());
    let sql = format!(
        "UPDATE users SET {} WHERE id = ?{}",
        assignments.join(", "),
        values.len()
    );
    let changed = conn.execute(&sql, params_from_iter(values.iter()))?;
    Ok(changed > 0)
}

pub(super) fn write_delete(conn: &Connection, user_id: &str) -> rusqlite::Result<bool> {
    let deleted = conn.execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
    Ok(deleted > 0)
}
