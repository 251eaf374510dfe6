mod common;

use std::sync::Arc;

use http::{Method, StatusCode};
use mirrorgate_backend::build_router;
use mirrorgate_backend::test_util::{create_test_state, seed_user, FakeIdentityProvider, StaticSessions};
use mirrorgate_common::{Role, UserStatus};

use common::send_request;

fn app() -> axum::Router {
    let sessions = StaticSessions::new().with("tok_user", "user_1", None);
    let state = create_test_state(sessions, Arc::new(FakeIdentityProvider::new()));
    seed_user(&state.store, "user_1", "u@example.com", Role::User, UserStatus::Active);
    build_router(state)
}

#[tokio::test]
async fn test_health() {
    let response = send_request(&app(), Method::GET, "/health", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["status"], "ok");
}

#[tokio::test]
async fn test_metrics_report_user_count() {
    let response = send_request(&app(), Method::GET, "/metrics", None, None).await;
    assert_eq!(response.status, StatusCode::OK);

    let text = String::from_utf8(response.body.to_vec()).unwrap();
    assert!(text.contains("mirrorgate_up 1"));
    assert!(text.contains("mirrorgate_users 1"));
    assert!(text.contains("mirrorgate_sync_pending 0"));
}

#[tokio::test]
async fn test_protected_path_without_session_is_unauthorized() {
    let app = app();

    let response = send_request(&app, Method::GET, "/api/admin/users", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json()["error"], "Unauthorized");

    // Unrouted protected paths are guarded too
    let response = send_request(&app, Method::GET, "/admin/dashboard", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_token_counts_as_no_session() {
    let response = send_request(&app(), Method::GET, "/api/admin/users", Some("forged"), None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_toggle_requires_session() {
    let response = send_request(&app(), Method::POST, "/api/users/user_1/toggle-block", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let response = send_request(&app(), Method::GET, "/nonexistent", Some("tok_user"), None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_blocked_notice_is_public() {
    let response = send_request(&app(), Method::GET, "/blocked", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    let html = String::from_utf8(response.body.to_vec()).unwrap();
    assert!(html.contains("Access blocked"));
}
