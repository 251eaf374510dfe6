use chrono::{DateTime, Utc};
use mirrorgate_common::{Role, UserStatus};
use serde::{Deserialize, Serialize};

/// Local mirror of an identity-provider account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// User ID from the identity provider
    pub id: String,
    pub email: Option<String>,
    pub role: Role,
    pub status: UserStatus,
    /// Set once, when the account was created at the provider
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// A freshly created, active account.
    pub fn new(id: impl Into<String>, email: impl Into<String>, role: Role, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            email: Some(email.into()),
            role,
            status: UserStatus::Active,
            created_at,
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.status.is_blocked()
    }
}

/// Partial update of a mirror record. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.role.is_none() && self.status.is_none()
    }
}
