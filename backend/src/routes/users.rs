use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};

use super::{caller_role, commit_mirror};
use crate::auth::AuthSession;
use crate::error::{ApiError, Result};
use crate::models::UserRecord;
use crate::permissions::check_toggle;
use crate::store::MirrorOp;
use crate::AppState;

/// Flip a user between ACTIVE and BLOCKED.
async fn toggle_block(
    State(state): State<Arc<AppState>>,
    AuthSession(session): AuthSession,
    Path(target_id): Path<String>,
) -> Result<Json<UserRecord>> {
    let caller = caller_role(&state, &session)?;
    if !caller.is_some_and(|role| role.is_staff()) {
        return Err(ApiError::forbidden());
    }

    let target = state
        .store
        .get_user(&target_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    check_toggle(caller, target.role)?;

    let status = target.status.toggled();
    state.identity.set_blocked(&target.id, status.is_blocked()).await?;
    commit_mirror(&state, &target.id, MirrorOp::SetStatus(status))?;

    tracing::info!(
        moderator_id = %session.user_id,
        target_id = %target.id,
        status = %status,
        "Toggled block"
    );

    Ok(Json(UserRecord { status, ..target }))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/users/:id/toggle-block", post(toggle_block))
        .with_state(state)
}
