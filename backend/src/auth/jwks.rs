use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};

use super::{AuthError, Session, SessionVerifier};

/// Minimum time between key refreshes triggered by unknown `kid`s.
const REFRESH_COOLDOWN: Duration = Duration::from_secs(60);

/// JWKS key set response.
#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    #[allow(dead_code)]
    alg: Option<String>,
    n: Option<String>,
    e: Option<String>,
}

/// Session token claims.
#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    sid: Option<String>,
    #[serde(default)]
    azp: Option<String>,
    #[serde(default)]
    public_metadata: Option<serde_json::Value>,
    #[serde(default, rename = "publicMetadata")]
    public_metadata_camel: Option<serde_json::Value>,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

impl Claims {
    /// The first metadata claim present, in order of preference.
    fn take_metadata(&mut self) -> Option<serde_json::Value> {
        self.public_metadata
            .take()
            .or_else(|| self.public_metadata_camel.take())
            .or_else(|| self.metadata.take())
    }
}

#[derive(Debug, Deserialize)]
struct OidcConfig {
    jwks_uri: String,
}

/// Client for fetching and caching JWKS keys, and verifying session tokens.
pub struct JwksClient {
    http_client: Client,
    jwks_uri: String,
    keys: RwLock<HashMap<String, DecodingKey>>,
    last_refresh: Mutex<Instant>,
    issuer: String,
    authorized_parties: Vec<String>,
}

impl JwksClient {
    pub async fn new(issuer: &str, authorized_parties: Vec<String>) -> Result<Self, AuthError> {
        let http_client = Client::new();

        // Fetch OIDC configuration to get JWKS URI
        let config_url = format!("{}/.well-known/openid-configuration", issuer.trim_end_matches('/'));
        let config: OidcConfig = http_client
            .get(&config_url)
            .send()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))?;

        let client = Self {
            http_client,
            jwks_uri: config.jwks_uri,
            keys: RwLock::new(HashMap::new()),
            last_refresh: Mutex::new(Instant::now()),
            issuer: issuer.trim_end_matches('/').to_string(),
            authorized_parties,
        };

        // Fetch keys initially
        client.refresh_keys().await?;

        Ok(client)
    }

    async fn refresh_keys(&self) -> Result<(), AuthError> {
        tracing::info!("Fetching JWKS from {}", self.jwks_uri);

        let response: JwksResponse = self.http_client
            .get(&self.jwks_uri)
            .send()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))?;

        let mut keys = self.keys.write().await;
        keys.clear();

        for jwk in response.keys {
            if jwk.kty == "RSA" {
                if let (Some(n), Some(e)) = (&jwk.n, &jwk.e) {
                    match DecodingKey::from_rsa_components(n, e) {
                        Ok(key) => {
                            keys.insert(jwk.kid.clone(), key);
                        }
                        Err(e) => {
                            tracing::warn!("Failed to parse RSA key {}: {}", jwk.kid, e);
                        }
                    }
                }
            }
        }

        tracing::info!("Loaded {} JWKS keys", keys.len());
        Ok(())
    }

    /// Refresh keys unless a refresh happened within the cooldown.
    async fn refresh_on_miss(&self) -> Result<bool, AuthError> {
        let mut last = self.last_refresh.lock().await;
        if last.elapsed() < REFRESH_COOLDOWN {
            return Ok(false);
        }
        *last = Instant::now();
        drop(last);

        self.refresh_keys().await?;
        Ok(true)
    }

    #[cfg(test)]
    fn has_key(&self, kid: &str) -> bool {
        self.keys
            .try_read()
            .map(|keys| keys.contains_key(kid))
            .unwrap_or(false)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        // Session tokens carry no audience
        validation.validate_aud = false;
        validation.leeway = 5;
        validation
    }

    fn check_party(&self, azp: Option<&str>) -> Result<(), AuthError> {
        if self.authorized_parties.is_empty() {
            return Ok(());
        }
        match azp {
            Some(party) if self.authorized_parties.iter().any(|p| p == party) => Ok(()),
            Some(party) => Err(AuthError::UnauthorizedParty(party.to_string())),
            None => Err(AuthError::UnauthorizedParty("<missing azp>".to_string())),
        }
    }
}

#[async_trait]
impl SessionVerifier for JwksClient {
    async fn verify(&self, token: &str) -> Result<Session, AuthError> {
        // Decode header to get kid
        let header = decode_header(token)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        let kid = header.kid
            .ok_or_else(|| AuthError::InvalidToken("Missing kid in token header".to_string()))?;

        if !self.keys.read().await.contains_key(&kid) && !self.refresh_on_miss().await? {
            return Err(AuthError::KeyNotFound(kid));
        }

        let keys = self.keys.read().await;
        let key = keys.get(&kid)
            .ok_or_else(|| AuthError::KeyNotFound(kid.clone()))?;

        let token_data = decode::<Claims>(token, key, &self.validation())
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let mut claims = token_data.claims;

        self.check_party(claims.azp.as_deref())?;

        let public_metadata = claims.take_metadata();

        Ok(Session {
            user_id: claims.sub,
            session_id: claims.sid,
            public_metadata,
        })
    }
}
