use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    let version = env!("CARGO_PKG_VERSION");
    let mut body = format!(
        "# HELP mirrorgate_up Whether the service is up\n\
         # TYPE mirrorgate_up gauge\n\
         mirrorgate_up 1\n\
         # HELP mirrorgate_info Service information\n\
         # TYPE mirrorgate_info gauge\n\
         mirrorgate_info{{version=\"{}\"}} 1\n",
        version
    );

    match (state.store.count_users(), state.store.pending_count()) {
        (Ok(users), Ok(pending)) => {
            body.push_str(&format!(
                "# HELP mirrorgate_users Mirrored user records\n\
                 # TYPE mirrorgate_users gauge\n\
                 mirrorgate_users {}\n\
                 # HELP mirrorgate_sync_pending Mirror writes awaiting reconciliation\n\
                 # TYPE mirrorgate_sync_pending gauge\n\
                 mirrorgate_sync_pending {}\n",
                users, pending
            ));
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!("Skipping store metrics: {}", e);
        }
    }

    (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(state)
}
