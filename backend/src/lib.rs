pub mod auth;
pub mod config;
pub mod error;
pub mod identity;
pub mod logging;
pub mod models;
pub mod permissions;
pub mod reconcile;
pub mod routes;
pub mod store;
pub mod sync;
pub mod test_util;
pub mod webhook;

pub use auth::{JwksClient, Session, SessionVerifier};
pub use config::{Config, ConfigError};
pub use error::ApiError;
pub use identity::{ClerkClient, IdentityProvider};
pub use reconcile::Reconciler;
pub use store::UserStore;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::response::IntoResponse;
use axum::{middleware, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::CorsConfig;
use crate::sync::RouteRules;
use crate::webhook::WebhookVerifier;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub sessions: Arc<dyn SessionVerifier>,
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<UserStore>,
    pub route_rules: RouteRules,
    /// `None` until a webhook secret is configured.
    pub webhook_verifier: Option<WebhookVerifier>,
}

impl AppState {
    pub fn new(
        config: Config,
        sessions: Arc<dyn SessionVerifier>,
        identity: Arc<dyn IdentityProvider>,
        store: Arc<UserStore>,
    ) -> Result<Self, ConfigError> {
        let route_rules = RouteRules::from_config(&config.routes)?;
        let webhook_verifier = config
            .clerk
            .webhook_secret
            .as_deref()
            .filter(|secret| !secret.trim().is_empty())
            .map(|secret| WebhookVerifier::new(secret, config.webhook.tolerance_secs))
            .transpose()
            .map_err(|_| ConfigError::Invalid("clerk.webhook_secret"))?;

        Ok(Self {
            config,
            sessions,
            identity,
            store,
            route_rules,
            webhook_verifier,
        })
    }
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins = config.origins.trim();
    let allow_origin = if origins == "*" {
        AllowOrigin::from(Any)
    } else {
        let list: Vec<HeaderValue> = origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin {}", o);
                    None
                }
            })
            .collect();
        AllowOrigin::list(list)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn not_found() -> impl IntoResponse {
    ApiError::NotFound("Not found".to_string())
}

/// Build the full application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors);

    Router::new()
        .merge(routes::health::router(state.clone()))
        .merge(routes::blocked::router(&state.config.routes.blocked_path))
        .merge(routes::webhooks::router(state.clone()))
        .merge(routes::admin::router(state.clone()))
        .merge(routes::users::router(state.clone()))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), sync::session_sync))
        .layer(middleware::from_fn(logging::request_logger))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
