//! Per-request session sync.
//!
//! Resolves the caller's session, keeps the mirror's role in line with the
//! session claim, turns blocked users away and guards protected paths.

pub mod rules;

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::auth::{extract_session_token, Session};
use crate::error::ApiError;
use crate::AppState;

pub use rules::RouteRules;

/// Middleware run in front of every route.
pub async fn session_sync(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if state.route_rules.is_static_asset(&path) {
        return next.run(request).await;
    }

    let token = extract_session_token(request.headers()).map(String::from);
    let session = match token {
        Some(token) => resolve_session(&state, &token).await,
        None => None,
    };

    let Some(session) = session else {
        if state.route_rules.is_protected(&path) {
            return ApiError::Unauthorized.into_response();
        }
        return next.run(request).await;
    };

    match reconcile(&state, &session, &path) {
        Ok(Some(redirect)) => return redirect,
        Ok(None) => {}
        Err(e) if state.config.sync.fail_open => {
            tracing::warn!(user_id = %session.user_id, "Mirror sync failed, continuing: {}", e);
        }
        Err(e) => {
            tracing::error!(user_id = %session.user_id, "Mirror sync failed: {}", e);
            return ApiError::Unavailable("User directory unavailable".to_string()).into_response();
        }
    }

    request.extensions_mut().insert(session);
    next.run(request).await
}

async fn resolve_session(state: &AppState, token: &str) -> Option<Session> {
    match state.sessions.verify(token).await {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::debug!("Ignoring invalid session: {}", e);
            None
        }
    }
}

/// Read the caller's mirror record, redirect if blocked, adopt the session's
/// role claim. `Ok(Some(_))` short-circuits the request.
fn reconcile(
    state: &AppState,
    session: &Session,
    path: &str,
) -> Result<Option<Response>, crate::store::StoreError> {
    let Some(user) = state.store.get_user(&session.user_id)? else {
        tracing::debug!("No mirror record for {}", session.user_id);
        return Ok(None);
    };

    if user.is_blocked() && !state.route_rules.is_blocked_path(path) {
        tracing::info!(user_id = %user.id, path = %path, "Redirecting blocked user");
        return Ok(Some(
            Redirect::temporary(state.route_rules.blocked_path()).into_response(),
        ));
    }

    if let Some(claimed) = session.role_claim() {
        if claimed != user.role {
            state.store.set_role(&user.id, claimed)?;
            tracing::info!(user_id = %user.id, from = %user.role, to = %claimed, "Adopted session role");
        }
    }

    Ok(None)
}
