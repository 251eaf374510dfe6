//! Account role and status enumerations.
//!
//! Both are stored and transmitted in their upper-case form (`ADMIN`,
//! `BLOCKED`, ...), which is also how the identity provider's public
//! metadata carries them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Staff role of an account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

impl Role {
    /// All role variants for iteration.
    pub const ALL: [Role; 3] = [Role::User, Role::Moderator, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Moderator => "MODERATOR",
            Role::Admin => "ADMIN",
        }
    }

    /// Read the `role` key of a public-metadata object.
    ///
    /// Returns `None` when the key is absent, not a string, or not one of
    /// the recognized values.
    pub fn from_metadata(metadata: &serde_json::Value) -> Option<Role> {
        metadata
            .get("role")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
    }

    /// Whether this role may open the staff tooling at all.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Moderator | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Role::User),
            "MODERATOR" => Ok(Role::Moderator),
            "ADMIN" => Ok(Role::Admin),
            other => Err(UnknownVariant {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

/// Whether an account may use the application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    #[default]
    Active,
    Blocked,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "ACTIVE",
            UserStatus::Blocked => "BLOCKED",
        }
    }

    /// Map the provider's `blocked` metadata flag to a status.
    pub fn from_blocked(blocked: bool) -> Self {
        if blocked {
            UserStatus::Blocked
        } else {
            UserStatus::Active
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, UserStatus::Blocked)
    }

    /// The opposite status, used by the block toggle.
    pub fn toggled(&self) -> Self {
        match self {
            UserStatus::Active => UserStatus::Blocked,
            UserStatus::Blocked => UserStatus::Active,
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(UserStatus::Active),
            "BLOCKED" => Ok(UserStatus::Blocked),
            other => Err(UnknownVariant {
                kind: "status",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&Role::Moderator).unwrap();
        assert_eq!(json, r#""MODERATOR""#);

        let parsed: Role = serde_json::from_str(r#""ADMIN""#).unwrap();
        assert_eq!(parsed, Role::Admin);
    }

    #[test]
    fn test_role_parse_is_case_sensitive() {
        assert_eq!("USER".parse::<Role>(), Ok(Role::User));
        assert!("admin".parse::<Role>().is_err());
        assert!("SUPERUSER".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_display_matches_parse() {
        for role in Role::ALL {
            assert_eq!(role.to_string().parse::<Role>(), Ok(role));
        }
    }

    #[test]
    fn test_role_from_metadata() {
        assert_eq!(Role::from_metadata(&json!({"role": "ADMIN"})), Some(Role::Admin));
        assert_eq!(Role::from_metadata(&json!({"role": "owner"})), None);
        assert_eq!(Role::from_metadata(&json!({"role": 3})), None);
        assert_eq!(Role::from_metadata(&json!({})), None);
        assert_eq!(Role::from_metadata(&json!(null)), None);
    }

    #[test]
    fn test_unknown_role_error_message() {
        let err = "ROOT".parse::<Role>().unwrap_err();
        assert_eq!(err.to_string(), "unknown role: ROOT");
    }

    #[test]
    fn test_status_from_blocked_flag() {
        assert_eq!(UserStatus::from_blocked(true), UserStatus::Blocked);
        assert_eq!(UserStatus::from_blocked(false), UserStatus::Active);
    }

    #[test]
    fn test_status_toggled() {
        assert_eq!(UserStatus::Active.toggled(), UserStatus::Blocked);
        assert_eq!(UserStatus::Blocked.toggled(), UserStatus::Active);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&UserStatus::Blocked).unwrap();
        assert_eq!(json, r#""BLOCKED""#);
        assert!("blocked".parse::<UserStatus>().is_err());
    }
}
