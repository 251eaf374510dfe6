//! Session authentication.
//!
//! Sessions are issued by the identity provider as short-lived JWTs, sent
//! either as a Bearer token or in the `__session` cookie.

pub mod jwks;

pub use jwks::JwksClient;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use mirrorgate_common::Role;

use crate::error::ApiError;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "__session";

/// Authenticated session extracted from a verified token.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Identity-provider user id (`sub` claim).
    pub user_id: String,
    /// Session id (`sid` claim).
    pub session_id: Option<String>,
    /// Public metadata copied into the token at issuance.
    pub public_metadata: Option<serde_json::Value>,
}

impl Session {
    /// Role carried in the token's public metadata, if recognized.
    pub fn role_claim(&self) -> Option<Role> {
        self.public_metadata.as_ref().and_then(Role::from_metadata)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing session token")]
    MissingToken,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("JWKS fetch error: {0}")]
    JwksFetchError(String),
    #[error("Key not found for kid: {0}")]
    KeyNotFound(String),
    #[error("Unauthorized party: {0}")]
    UnauthorizedParty(String),
}

/// Verifies session tokens.
#[async_trait]
pub trait SessionVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Session, AuthError>;
}

/// Pull the session token from the Authorization header or the session cookie.
///
/// The header wins when both are present.
pub fn extract_session_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|t| !t.is_empty())
}

/// Extractor for handlers that need a session.
///
/// The sync middleware stores the verified [`Session`] in request
/// extensions; without one the request is rejected with 401.
#[derive(Debug, Clone)]
pub struct AuthSession(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .map(AuthSession)
            .ok_or(ApiError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.append(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                value.parse().unwrap(),
            );
        }
        headers
    }

    #[test]
    fn test_extract_bearer_token() {
        let h = headers(&[("authorization", "Bearer abc.def.ghi")]);
        assert_eq!(extract_session_token(&h), Some("abc.def.ghi"));
    }

    #[test]
    fn test_extract_basic_auth_is_ignored() {
        let h = headers(&[("authorization", "Basic dXNlcjpwYXNz")]);
        assert_eq!(extract_session_token(&h), None);
    }

    #[test]
    fn test_extract_session_cookie() {
        let h = headers(&[("cookie", "theme=dark; __session=tok123; other=1")]);
        assert_eq!(extract_session_token(&h), Some("tok123"));
    }

    #[test]
    fn test_extract_session_cookie_across_headers() {
        let h = headers(&[("cookie", "theme=dark"), ("cookie", "__session=tok456")]);
        assert_eq!(extract_session_token(&h), Some("tok456"));
    }

    #[test]
    fn test_header_wins_over_cookie() {
        let h = headers(&[("cookie", "__session=from-cookie"), ("authorization", "Bearer from-header")]);
        assert_eq!(extract_session_token(&h), Some("from-header"));
    }

    #[test]
    fn test_empty_headers_have_no_token() {
        assert_eq!(extract_session_token(&HeaderMap::new()), None);
        let h = headers(&[("cookie", "__session=")]);
        assert_eq!(extract_session_token(&h), None);
    }

    #[test]
    fn test_session_role_claim() {
        let session = Session {
            user_id: "user_1".to_string(),
            session_id: None,
            public_metadata: Some(json!({"role": "MODERATOR"})),
        };
        assert_eq!(session.role_claim(), Some(Role::Moderator));

        let unknown = Session {
            public_metadata: Some(json!({"role": "superuser"})),
            ..session.clone()
        };
        assert_eq!(unknown.role_claim(), None);

        let none = Session {
            public_metadata: None,
            ..session
        };
        assert_eq!(none.role_claim(), None);
    }

    #[test]
    fn test_auth_error_messages() {
        assert_eq!(AuthError::MissingToken.to_string(), "Missing session token");
        assert!(AuthError::KeyNotFound("kid1".into()).to_string().contains("kid1"));
    }
}
