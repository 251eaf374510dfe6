//! Request and response bodies of the administrative API.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::UnknownVariant;

/// Mutation applied by the email-keyed admin endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminAction {
    Block,
    Unblock,
    Delete,
}

impl fmt::Display for AdminAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminAction::Block => write!(f, "block"),
            AdminAction::Unblock => write!(f, "unblock"),
            AdminAction::Delete => write!(f, "delete"),
        }
    }
}

impl FromStr for AdminAction {
    type Err = UnknownVariant;

    /// Case-insensitive, matching the path segment as typed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "block" => Ok(AdminAction::Block),
            "unblock" => Ok(AdminAction::Unblock),
            "delete" => Ok(AdminAction::Delete),
            _ => Err(UnknownVariant {
                kind: "action",
                value: s.to_string(),
            }),
        }
    }
}

/// Body of `POST /api/admin/users/:action`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    #[serde(default)]
    pub email: Option<String>,
}

/// Human-readable success body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error body returned by every endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
