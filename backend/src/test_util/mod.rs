//! Test doubles and fixtures shared by unit and integration tests.

pub mod fake_identity;

pub use fake_identity::{FakeIdentityProvider, ProviderCall};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use mirrorgate_common::{Role, UserStatus};
use serde_json::json;

use crate::auth::{AuthError, Session, SessionVerifier};
use crate::config::{
    ClerkConfig, Config, CorsConfig, DatabaseConfig, LoggingConfig, ReconcileConfig, RoutesConfig,
    SyncConfig, WebhookConfig,
};
use crate::models::UserRecord;
use crate::store::UserStore;
use crate::webhook::signature::{HEADER_ID, HEADER_SIGNATURE, HEADER_TIMESTAMP};
use crate::webhook::WebhookVerifier;
use crate::AppState;

/// base64 of "mirrorgate-test-signing-secret".
pub const TEST_WEBHOOK_SECRET: &str = "whsec_bWlycm9yZ2F0ZS10ZXN0LXNpZ25pbmctc2VjcmV0";

pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 8080,
        database: DatabaseConfig {
            url: ":memory:".to_string(),
            max_connections: 1,
        },
        clerk: ClerkConfig {
            api_url: "http://localhost:1".to_string(),
            secret_key: "sk_test_123".to_string(),
            issuer: "https://clerk.test".to_string(),
            authorized_parties: vec![],
            webhook_secret: Some(TEST_WEBHOOK_SECRET.to_string()),
        },
        webhook: WebhookConfig::default(),
        routes: RoutesConfig::default(),
        sync: SyncConfig::default(),
        reconcile: ReconcileConfig::default(),
        logging: LoggingConfig {
            level: "debug".to_string(),
            json: false,
        },
        cors: CorsConfig::default(),
    }
}

/// Session verifier backed by a fixed token table.
#[derive(Default, Clone)]
pub struct StaticSessions {
    sessions: HashMap<String, Session>,
}

impl StaticSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token` as a session for `user_id`, optionally carrying a role claim.
    pub fn with(mut self, token: &str, user_id: &str, role: Option<Role>) -> Self {
        let public_metadata = role.map(|r| json!({ "role": r.as_str() }));
        self.sessions.insert(
            token.to_string(),
            Session {
                user_id: user_id.to_string(),
                session_id: Some(format!("sess_{}", user_id)),
                public_metadata,
            },
        );
        self
    }
}

#[async_trait]
impl SessionVerifier for StaticSessions {
    async fn verify(&self, token: &str) -> Result<Session, AuthError> {
        self.sessions
            .get(token)
            .cloned()
            .ok_or_else(|| AuthError::InvalidToken("unknown test token".to_string()))
    }
}

pub fn create_test_state_with(
    config: Config,
    sessions: StaticSessions,
    identity: Arc<FakeIdentityProvider>,
) -> Arc<AppState> {
    let store = Arc::new(
        UserStore::new(&config.database.url, config.database.max_connections)
            .expect("Failed to open test store"),
    );
    Arc::new(
        AppState::new(config, Arc::new(sessions), identity, store)
            .expect("Failed to build test state"),
    )
}

pub fn create_test_state(sessions: StaticSessions, identity: Arc<FakeIdentityProvider>) -> Arc<AppState> {
    create_test_state_with(test_config(), sessions, identity)
}

/// Insert a mirror record directly.
pub fn seed_user(store: &UserStore, id: &str, email: &str, role: Role, status: UserStatus) -> UserRecord {
    let user = UserRecord {
        status,
        ..UserRecord::new(id, email, role, Utc::now())
    };
    store.create_user(&user).expect("Failed to seed user");
    user
}

/// Svix headers for `body`, signed now with [`TEST_WEBHOOK_SECRET`].
pub fn sign_webhook(delivery_id: &str, body: &str) -> Vec<(&'static str, String)> {
    let timestamp = Utc::now().timestamp();
    let signature = WebhookVerifier::new(TEST_WEBHOOK_SECRET, 300)
        .and_then(|v| v.sign(delivery_id, timestamp, body.as_bytes()))
        .expect("Failed to sign test webhook");

    vec![
        (HEADER_ID, delivery_id.to_string()),
        (HEADER_TIMESTAMP, timestamp.to_string()),
        (HEADER_SIGNATURE, signature),
    ]
}

/// Drop the users table so every mirror read fails.
pub fn break_user_table(store: &UserStore) {
    store
        .conn()
        .and_then(|conn| Ok(conn.execute_batch("DROP TABLE users;")?))
        .expect("Failed to drop users table");
}

/// Make updates and deletes of mirror records fail while reads keep working.
pub fn reject_mirror_writes(store: &UserStore) {
    store
        .conn()
        .and_then(|conn| {
            Ok(conn.execute_batch(
                "CREATE TRIGGER reject_user_update BEFORE UPDATE ON users
                 BEGIN SELECT RAISE(ABORT, 'mirror unavailable'); END;
                 CREATE TRIGGER reject_user_delete BEFORE DELETE ON users
                 BEGIN SELECT RAISE(ABORT, 'mirror unavailable'); END;",
            )?)
        })
        .expect("Failed to install mirror write triggers");
}

/// Drop the sync outbox so deferring a mirror write fails.
pub fn break_outbox(store: &UserStore) {
    store
        .conn()
        .and_then(|conn| Ok(conn.execute_batch("DROP TABLE sync_outbox;")?))
        .expect("Failed to drop sync outbox");
}
