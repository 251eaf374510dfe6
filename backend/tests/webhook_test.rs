mod common;

use std::sync::Arc;

use http::StatusCode;
use mirrorgate_backend::test_util::{
    create_test_state, create_test_state_with, seed_user, sign_webhook, test_config,
    FakeIdentityProvider, StaticSessions,
};
use mirrorgate_backend::{build_router, AppState};
use mirrorgate_common::{Role, UserStatus};
use serde_json::{json, Value};

use common::{send_signed_webhook, send_webhook};

fn setup() -> (Arc<AppState>, axum::Router) {
    let state = create_test_state(StaticSessions::new(), Arc::new(FakeIdentityProvider::new()));
    let app = build_router(state.clone());
    (state, app)
}

fn user_created(id: &str, email: &str, metadata: Value) -> Value {
    json!({
        "type": "user.created",
        "object": "event",
        "data": {
            "id": id,
            "email_addresses": [{"id": "idn_1", "email_address": email}],
            "primary_email_address_id": "idn_1",
            "public_metadata": metadata,
            "created_at": 1_700_000_000_000i64
        }
    })
}

#[tokio::test]
async fn test_created_event_mirrors_user() {
    let (state, app) = setup();

    let response = send_signed_webhook(&app, "msg_1", &user_created("user_1", "a@example.com", json!({}))).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["message"], "Webhook processed successfully");

    let user = state.store.get_user("user_1").unwrap().unwrap();
    assert_eq!(user.email.as_deref(), Some("a@example.com"));
    assert_eq!(user.role, Role::User);
    assert_eq!(user.status, UserStatus::Active);
}

#[tokio::test]
async fn test_missing_signature_header_is_rejected_without_mutation() {
    let (state, app) = setup();
    let body = user_created("user_1", "a@example.com", json!({})).to_string();

    let headers: Vec<_> = sign_webhook("msg_1", &body)
        .into_iter()
        .filter(|(name, _)| *name != "svix-signature")
        .collect();
    let response = send_webhook(&app, headers, &body).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(state.store.get_user("user_1").unwrap().is_none());
}

#[tokio::test]
async fn test_bad_signature_is_rejected_without_mutation() {
    let (state, app) = setup();
    let signed_for = user_created("user_1", "a@example.com", json!({})).to_string();
    let tampered = user_created("user_1", "a@example.com", json!({"role": "ADMIN"})).to_string();

    let response = send_webhook(&app, sign_webhook("msg_1", &signed_for), &tampered).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(state.store.get_user("user_1").unwrap().is_none());
    assert!(!state.store.is_event_processed("msg_1").unwrap());
}

#[tokio::test]
async fn test_unconfigured_secret_answers_500() {
    let mut config = test_config();
    config.clerk.webhook_secret = None;
    let state = create_test_state_with(config, StaticSessions::new(), Arc::new(FakeIdentityProvider::new()));
    let app = build_router(state.clone());

    let response = send_signed_webhook(&app, "msg_1", &user_created("user_1", "a@example.com", json!({}))).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(state.store.get_user("user_1").unwrap().is_none());
}

#[tokio::test]
async fn test_redelivered_create_is_acknowledged_once() {
    let (state, app) = setup();
    let event = user_created("user_1", "a@example.com", json!({}));

    let first = send_signed_webhook(&app, "msg_1", &event).await;
    let second = send_signed_webhook(&app, "msg_1", &event).await;

    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.json()["message"], "Webhook already processed");
    assert_eq!(state.store.count_users().unwrap(), 1);
}

#[tokio::test]
async fn test_duplicate_create_with_new_delivery_id_keeps_one_record() {
    let (state, app) = setup();

    send_signed_webhook(&app, "msg_1", &user_created("user_1", "a@example.com", json!({}))).await;
    let response =
        send_signed_webhook(&app, "msg_2", &user_created("user_1", "b@example.com", json!({}))).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(state.store.count_users().unwrap(), 1);
    assert_eq!(
        state.store.get_user("user_1").unwrap().unwrap().email.as_deref(),
        Some("a@example.com")
    );
}

#[tokio::test]
async fn test_created_without_email_is_bad_request() {
    let (state, app) = setup();
    let event = json!({
        "type": "user.created",
        "data": {"id": "user_1", "email_addresses": []}
    });

    let response = send_signed_webhook(&app, "msg_1", &event).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(state.store.count_users().unwrap(), 0);
    assert!(!state.store.is_event_processed("msg_1").unwrap());
}

#[tokio::test]
async fn test_update_without_recognized_fields_is_noop() {
    let (state, app) = setup();
    let before = seed_user(&state.store, "user_1", "a@example.com", Role::Moderator, UserStatus::Active);

    let event = json!({
        "type": "user.updated",
        "data": {"id": "user_1", "public_metadata": {"theme": "dark"}}
    });
    let response = send_signed_webhook(&app, "msg_1", &event).await;

    assert_eq!(response.status, StatusCode::OK);
    let after = state.store.get_user("user_1").unwrap().unwrap();
    assert_eq!(after.role, before.role);
    assert_eq!(after.status, before.status);
    assert_eq!(after.email, before.email);
}

#[tokio::test]
async fn test_update_applies_blocked_flag() {
    let (state, app) = setup();
    seed_user(&state.store, "user_1", "a@example.com", Role::User, UserStatus::Active);

    let event = json!({
        "type": "user.updated",
        "data": {"id": "user_1", "public_metadata": {"blocked": true}}
    });
    let response = send_signed_webhook(&app, "msg_1", &event).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(state.store.get_user("user_1").unwrap().unwrap().status, UserStatus::Blocked);
}

#[tokio::test]
async fn test_delete_for_absent_user_succeeds() {
    let (state, app) = setup();
    let event = json!({"type": "user.deleted", "data": {"id": "ghost", "deleted": true}});

    let response = send_signed_webhook(&app, "msg_1", &event).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(state.store.get_user("ghost").unwrap().is_none());
}

#[tokio::test]
async fn test_delete_removes_mirror_record() {
    let (state, app) = setup();
    seed_user(&state.store, "user_1", "a@example.com", Role::User, UserStatus::Active);

    let event = json!({"type": "user.deleted", "data": {"id": "user_1", "deleted": true}});
    let response = send_signed_webhook(&app, "msg_1", &event).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(state.store.get_user("user_1").unwrap().is_none());
}

#[tokio::test]
async fn test_other_events_are_acknowledged() {
    let (state, app) = setup();
    let event = json!({"type": "session.created", "data": {"id": "sess_1"}});

    let response = send_signed_webhook(&app, "msg_1", &event).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(state.store.count_users().unwrap(), 0);
}
