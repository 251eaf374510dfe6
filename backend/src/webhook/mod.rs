//! Identity provider webhook ingestion.

pub mod signature;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use mirrorgate_common::{ErrorResponse, UserEventData, WebhookEvent, WebhookEventKind};

use crate::models::{UserRecord, UserUpdate};
use crate::store::{StoreError, UserStore};

pub use signature::{SignatureError, SvixHeaders, WebhookVerifier};

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Webhook secret is not configured")]
    SecretNotConfigured,
    #[error("Missing svix headers")]
    MissingHeaders,
    #[error("Invalid signature: {0}")]
    Verification(#[from] SignatureError),
    #[error("{0}")]
    Malformed(String),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl WebhookError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookError::SecretNotConfigured | WebhookError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            WebhookError::MissingHeaders
            | WebhookError::Verification(_)
            | WebhookError::Malformed(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            WebhookError::Store(_) => {
                tracing::error!("Webhook processing failed: {}", self);
                "Internal server error".to_string()
            }
            WebhookError::SecretNotConfigured => {
                tracing::error!("{}", self);
                self.to_string()
            }
            other => {
                tracing::warn!("Rejected webhook: {}", other);
                other.to_string()
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// What applying an event did to the mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// `inserted` is false when a record with the id already existed.
    Created { user_id: String, inserted: bool },
    Updated { user_id: String, changed: bool },
    Deleted { user_id: String, existed: bool },
    Ignored(String),
}

/// Apply a verified event to the mirror.
pub fn apply_event(store: &UserStore, event: &WebhookEvent) -> Result<WebhookOutcome, WebhookError> {
    match event.kind() {
        WebhookEventKind::UserCreated => on_created(store, &user_data(event)?),
        WebhookEventKind::UserUpdated => on_updated(store, &user_data(event)?),
        WebhookEventKind::UserDeleted => on_deleted(store, &user_data(event)?),
        WebhookEventKind::Other(kind) => {
            tracing::debug!("Ignoring webhook event {}", kind);
            Ok(WebhookOutcome::Ignored(kind))
        }
    }
}

fn user_data(event: &WebhookEvent) -> Result<UserEventData, WebhookError> {
    event
        .user_data()
        .map_err(|e| WebhookError::Malformed(format!("Invalid user payload: {}", e)))
}

fn require_id(data: &UserEventData) -> Result<String, WebhookError> {
    data.user_id()
        .map(String::from)
        .ok_or_else(|| WebhookError::Malformed("Missing user id".to_string()))
}

fn on_created(store: &UserStore, data: &UserEventData) -> Result<WebhookOutcome, WebhookError> {
    let user_id = require_id(data)?;
    let email = data
        .primary_email()
        .ok_or_else(|| WebhookError::Malformed("Missing email address".to_string()))?;
    let role = data.role_hint().unwrap_or_default();
    let created_at = data.created_at().unwrap_or_else(Utc::now);

    let record = UserRecord::new(user_id.clone(), email, role, created_at);
    let inserted = store.create_user(&record)?;
    if inserted {
        tracing::info!("Mirrored new user {} as {}", user_id, role);
    } else {
        tracing::info!("User {} already mirrored, skipping create", user_id);
    }

    Ok(WebhookOutcome::Created { user_id, inserted })
}

fn on_updated(store: &UserStore, data: &UserEventData) -> Result<WebhookOutcome, WebhookError> {
    let user_id = require_id(data)?;
    let update = UserUpdate {
        email: data.primary_email().map(String::from),
        role: data.role_hint(),
        status: data.status_hint(),
    };

    if update.is_empty() {
        tracing::debug!("Update for {} carries no mirrored fields", user_id);
        return Ok(WebhookOutcome::Updated { user_id, changed: false });
    }

    let changed = store.update_user(&user_id, &update)?;
    if !changed {
        tracing::info!("Update for unknown user {} ignored", user_id);
    }

    Ok(WebhookOutcome::Updated { user_id, changed })
}

fn on_deleted(store: &UserStore, data: &UserEventData) -> Result<WebhookOutcome, WebhookError> {
    let user_id = require_id(data)?;
    let existed = store.delete_user(&user_id)?;
    if existed {
        tracing::info!("Removed mirror record {}", user_id);
    } else {
        tracing::debug!("Delete for absent user {}", user_id);
    }

    Ok(WebhookOutcome::Deleted { user_id, existed })
}
