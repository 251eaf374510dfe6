//! Identity-provider webhook payloads.
//!
//! Only the `user.*` events are interpreted. Every field of the user
//! payload is optional here; deciding which ones are required is up to the
//! handler for each event kind.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{Role, UserStatus};

/// Envelope of a webhook delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
}

/// Event kinds the mirror reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventKind {
    UserCreated,
    UserUpdated,
    UserDeleted,
    Other(String),
}

impl WebhookEvent {
    pub fn kind(&self) -> WebhookEventKind {
        match self.event_type.as_str() {
            "user.created" => WebhookEventKind::UserCreated,
            "user.updated" => WebhookEventKind::UserUpdated,
            "user.deleted" => WebhookEventKind::UserDeleted,
            other => WebhookEventKind::Other(other.to_string()),
        }
    }

    /// Decode `data` as a user payload.
    pub fn user_data(&self) -> Result<UserEventData, serde_json::Error> {
        UserEventData::deserialize(&self.data)
    }
}

/// An email address entry of a user payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailAddress {
    #[serde(default)]
    pub id: Option<String>,
    pub email_address: String,
}

/// The `data` object of `user.created`, `user.updated` and `user.deleted`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserEventData {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email_addresses: Option<Vec<EmailAddress>>,
    #[serde(default)]
    pub primary_email_address_id: Option<String>,
    #[serde(default)]
    pub public_metadata: Option<serde_json::Value>,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub created_at: Option<i64>,
}

impl UserEventData {
    /// The primary email address, falling back to the first listed one.
    pub fn primary_email(&self) -> Option<&str> {
        let addresses = self.email_addresses.as_deref()?;
        let primary = self.primary_email_address_id.as_deref().and_then(|primary_id| {
            addresses
                .iter()
                .find(|a| a.id.as_deref() == Some(primary_id))
        });
        primary
            .or_else(|| addresses.first())
            .map(|a| a.email_address.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Non-empty user id.
    pub fn user_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|s| !s.is_empty())
    }

    /// Role carried in public metadata, if present and recognized.
    pub fn role_hint(&self) -> Option<Role> {
        self.public_metadata.as_ref().and_then(Role::from_metadata)
    }

    /// Status derived from the `blocked` metadata flag, if the flag is present.
    pub fn status_hint(&self) -> Option<UserStatus> {
        self.public_metadata
            .as_ref()
            .and_then(|m| m.get("blocked"))
            .and_then(|v| v.as_bool())
            .map(UserStatus::from_blocked)
    }

    /// Creation time, if the payload carries a valid one.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn created_event() -> WebhookEvent {
        serde_json::from_value(json!({
            "type": "user.created",
            "object": "event",
            "data": {
                "id": "user_2abc",
                "email_addresses": [
                    {"id": "idn_1", "email_address": "old@example.com"},
                    {"id": "idn_2", "email_address": "main@example.com"}
                ],
                "primary_email_address_id": "idn_2",
                "public_metadata": {"role": "MODERATOR"},
                "created_at": 1_700_000_000_000i64
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_event_kind() {
        assert_eq!(created_event().kind(), WebhookEventKind::UserCreated);

        let other: WebhookEvent =
            serde_json::from_value(json!({"type": "session.created", "data": {}})).unwrap();
        assert_eq!(other.kind(), WebhookEventKind::Other("session.created".to_string()));
    }

    #[test]
    fn test_primary_email_follows_primary_id() {
        let data = created_event().user_data().unwrap();
        assert_eq!(data.primary_email(), Some("main@example.com"));
    }

    #[test]
    fn test_primary_email_falls_back_to_first() {
        let data = UserEventData {
            email_addresses: Some(vec![EmailAddress {
                id: None,
                email_address: "only@example.com".to_string(),
            }]),
            primary_email_address_id: Some("idn_missing".to_string()),
            ..Default::default()
        };
        assert_eq!(data.primary_email(), Some("only@example.com"));
    }

    #[test]
    fn test_primary_email_absent() {
        let data = UserEventData::default();
        assert_eq!(data.primary_email(), None);

        let empty = UserEventData {
            email_addresses: Some(vec![]),
            ..Default::default()
        };
        assert_eq!(empty.primary_email(), None);
    }

    #[test]
    fn test_role_and_status_hints() {
        let data = created_event().user_data().unwrap();
        assert_eq!(data.role_hint(), Some(Role::Moderator));
        assert_eq!(data.status_hint(), None);

        let blocked = UserEventData {
            public_metadata: Some(json!({"blocked": true, "role": "GOD"})),
            ..Default::default()
        };
        assert_eq!(blocked.role_hint(), None);
        assert_eq!(blocked.status_hint(), Some(UserStatus::Blocked));
    }

    #[test]
    fn test_created_at_from_millis() {
        let data = created_event().user_data().unwrap();
        let created = data.created_at().unwrap();
        assert_eq!(created.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_deleted_payload() {
        let event: WebhookEvent = serde_json::from_value(json!({
            "type": "user.deleted",
            "data": {"id": "user_2abc", "deleted": true, "object": "user"}
        }))
        .unwrap();
        let data = event.user_data().unwrap();
        assert_eq!(data.user_id(), Some("user_2abc"));
        assert!(data.primary_email().is_none());
    }

    #[test]
    fn test_null_fields_are_tolerated() {
        let event: WebhookEvent = serde_json::from_value(json!({
            "type": "user.updated",
            "data": {"id": "user_1", "email_addresses": null, "public_metadata": null}
        }))
        .unwrap();
        let data = event.user_data().unwrap();
        assert_eq!(data.primary_email(), None);
        assert_eq!(data.role_hint(), None);
    }
}
