//! Svix webhook signature verification.
//!
//! The signed content is `"{id}.{timestamp}.{body}"`, signed with
//! HMAC-SHA256 under the base64-decoded secret. The signature header holds
//! space-separated `v1,<base64>` entries; any one matching is enough.

use axum::http::HeaderMap;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

pub const HEADER_ID: &str = "svix-id";
pub const HEADER_TIMESTAMP: &str = "svix-timestamp";
pub const HEADER_SIGNATURE: &str = "svix-signature";

const SECRET_PREFIX: &str = "whsec_";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Webhook secret is not valid base64")]
    InvalidSecret,
    #[error("Invalid timestamp header")]
    InvalidTimestamp,
    #[error("Message timestamp too old")]
    TimestampTooOld,
    #[error("Message timestamp too new")]
    TimestampTooNew,
    #[error("No matching signature found")]
    NoMatchingSignature,
}

/// The three delivery headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvixHeaders {
    pub id: String,
    pub timestamp: String,
    pub signature: String,
}

impl SvixHeaders {
    /// `None` if any of the headers is missing or empty.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        Some(Self {
            id: get(HEADER_ID)?,
            timestamp: get(HEADER_TIMESTAMP)?,
            signature: get(HEADER_SIGNATURE)?,
        })
    }
}

/// Verifies webhook deliveries against the signing secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    key: Vec<u8>,
    tolerance_secs: i64,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("tolerance_secs", &self.tolerance_secs)
            .finish_non_exhaustive()
    }
}

impl WebhookVerifier {
    /// Build from a `whsec_`-prefixed (or bare) base64 secret.
    pub fn new(secret: &str, tolerance_secs: u64) -> Result<Self, SignatureError> {
        let encoded = secret.trim();
        let encoded = encoded.strip_prefix(SECRET_PREFIX).unwrap_or(encoded);
        let key = STANDARD
            .decode(encoded)
            .map_err(|_| SignatureError::InvalidSecret)?;
        if key.is_empty() {
            return Err(SignatureError::InvalidSecret);
        }

        Ok(Self {
            key,
            tolerance_secs: i64::try_from(tolerance_secs).unwrap_or(i64::MAX),
        })
    }

    pub fn verify(&self, headers: &SvixHeaders, body: &[u8]) -> Result<(), SignatureError> {
        self.verify_at(headers, body, Utc::now().timestamp())
    }

    /// Verify as if the current time were `now` (Unix seconds).
    pub fn verify_at(&self, headers: &SvixHeaders, body: &[u8], now: i64) -> Result<(), SignatureError> {
        let timestamp: i64 = headers
            .timestamp
            .parse()
            .map_err(|_| SignatureError::InvalidTimestamp)?;

        if now.saturating_sub(timestamp) > self.tolerance_secs {
            return Err(SignatureError::TimestampTooOld);
        }
        if timestamp.saturating_sub(now) > self.tolerance_secs {
            return Err(SignatureError::TimestampTooNew);
        }

        let expected = self.compute(&headers.id, timestamp, body)?;

        let matched = headers
            .signature
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == "v1")
            .any(|(_, sig)| bool::from(sig.as_bytes().ct_eq(expected.as_bytes())));

        if matched {
            Ok(())
        } else {
            Err(SignatureError::NoMatchingSignature)
        }
    }

    /// Produce a `v1,<base64>` signature entry for a delivery.
    pub fn sign(&self, id: &str, timestamp: i64, body: &[u8]) -> Result<String, SignatureError> {
        Ok(format!("v1,{}", self.compute(id, timestamp, body)?))
    }

    fn compute(&self, id: &str, timestamp: i64, body: &[u8]) -> Result<String, SignatureError> {
        let mut mac = <Hmac<Sha256>>::new_from_slice(&self.key)
            .map_err(|_| SignatureError::InvalidSecret)?;
        mac.update(id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }
}
