use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use mirrorgate_common::{MessageResponse, WebhookEvent};

use crate::webhook::{apply_event, SvixHeaders, WebhookError};
use crate::AppState;

/// Receives user lifecycle events from the identity provider.
async fn clerk_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<MessageResponse>, WebhookError> {
    let verifier = state
        .webhook_verifier
        .as_ref()
        .ok_or(WebhookError::SecretNotConfigured)?;
    let delivery = SvixHeaders::from_headers(&headers).ok_or(WebhookError::MissingHeaders)?;
    verifier.verify(&delivery, &body)?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| WebhookError::Malformed(format!("Invalid event payload: {}", e)))?;

    if state.store.is_event_processed(&delivery.id)? {
        tracing::info!(delivery_id = %delivery.id, "Duplicate webhook delivery acknowledged");
        return Ok(Json(MessageResponse::new("Webhook already processed")));
    }

    let outcome = apply_event(&state.store, &event)?;
    state.store.record_event(&delivery.id, &event.event_type)?;

    tracing::info!(
        delivery_id = %delivery.id,
        event_type = %event.event_type,
        outcome = ?outcome,
        "Webhook processed"
    );

    Ok(Json(MessageResponse::new("Webhook processed successfully")))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/webhooks/clerk", post(clerk_webhook))
        .with_state(state)
}
