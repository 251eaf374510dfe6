//! Identity provider abstraction.
//!
//! The provider is the system of record for accounts. This service only
//! looks accounts up by email, flips the `blocked` flag in their public
//! metadata, and deletes them.

mod clerk;

pub use clerk::ClerkClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use mirrorgate_common::EmailAddress;

/// Account as returned by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderUser {
    pub id: String,
    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,
    #[serde(default)]
    pub public_metadata: serde_json::Value,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("User not found: {0}")]
    NotFound(String),
    #[error("Identity provider error: {0}")]
    Api(String),
}

/// Operations this service needs from the identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Look up an account by any of its email addresses.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<ProviderUser>, IdentityError>;

    /// Set the `blocked` flag in the account's public metadata, keeping
    /// every other metadata key.
    async fn set_blocked(&self, user_id: &str, blocked: bool) -> Result<(), IdentityError>;

    /// Delete the account.
    async fn delete_user(&self, user_id: &str) -> Result<(), IdentityError>;
}
