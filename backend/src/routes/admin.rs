//! Admin API routes.
//!
//! - `GET /api/admin/users` lists the mirror
//! - `POST /api/admin/users/:action` blocks, unblocks or deletes a user by email

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use mirrorgate_common::{ActionRequest, AdminAction, MessageResponse, UserStatus};

use super::{caller_role, commit_mirror};
use crate::auth::AuthSession;
use crate::error::{ApiError, Result};
use crate::models::UserRecord;
use crate::permissions::require_admin;
use crate::store::MirrorOp;
use crate::AppState;

async fn list_users(
    State(state): State<Arc<AppState>>,
    AuthSession(session): AuthSession,
) -> Result<Json<Vec<UserRecord>>> {
    require_admin(caller_role(&state, &session)?)?;
    Ok(Json(state.store.list_users()?))
}

async fn user_action(
    State(state): State<Arc<AppState>>,
    AuthSession(session): AuthSession,
    Path(action): Path<String>,
    body: std::result::Result<Json<ActionRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    require_admin(caller_role(&state, &session)?)?;

    let action: AdminAction = action
        .parse()
        .map_err(|_| ApiError::BadRequest("Unknown action".to_string()))?;
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let email = body
        .email
        .map(|email| email.trim().to_string())
        .filter(|email| !email.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Email is required".to_string()))?;

    let user = state
        .identity
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User with email {} not found", email)))?;

    let (op, message) = match action {
        AdminAction::Block => {
            state.identity.set_blocked(&user.id, true).await?;
            (MirrorOp::SetStatus(UserStatus::Blocked), "User blocked")
        }
        AdminAction::Unblock => {
            state.identity.set_blocked(&user.id, false).await?;
            (MirrorOp::SetStatus(UserStatus::Active), "User unblocked")
        }
        AdminAction::Delete => {
            state.identity.delete_user(&user.id).await?;
            (MirrorOp::Delete, "User deleted")
        }
    };
    commit_mirror(&state, &user.id, op)?;

    tracing::info!(
        admin_id = %session.user_id,
        target_id = %user.id,
        action = %action,
        "Admin action applied"
    );

    Ok(Json(MessageResponse::new(message)))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/:action", post(user_action))
        .with_state(state)
}
