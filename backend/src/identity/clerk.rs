use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;

use super::{IdentityError, IdentityProvider, ProviderUser};

/// Client for the Clerk Backend API.
pub struct ClerkClient {
    http_client: Client,
    base_url: String,
    secret_key: String,
}

impl ClerkClient {
    pub fn new(base_url: &str, secret_key: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        }
    }

    fn user_url(&self, user_id: &str) -> String {
        format!("{}/v1/users/{}", self.base_url, user_id)
    }

    /// Map a non-success response to an error.
    async fn check(response: reqwest::Response, user_id: &str) -> Result<reqwest::Response, IdentityError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(IdentityError::NotFound(user_id.to_string()));
        }
        let body = response.text().await.unwrap_or_default();
        Err(IdentityError::Api(format!("{}: {}", status, body)))
    }
}

#[async_trait]
impl IdentityProvider for ClerkClient {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<ProviderUser>, IdentityError> {
        let url = format!("{}/v1/users", self.base_url);

        tracing::debug!("Looking up identity-provider user by email: {}", url);

        let response = self.http_client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .query(&[("email_address", email), ("limit", "1")])
            .send()
            .await
            .map_err(|e| IdentityError::RequestFailed(e.to_string()))?;

        let response = Self::check(response, email).await?;
        let users: Vec<ProviderUser> = response
            .json()
            .await
            .map_err(|e| IdentityError::InvalidResponse(e.to_string()))?;

        Ok(users.into_iter().next())
    }

    async fn set_blocked(&self, user_id: &str, blocked: bool) -> Result<(), IdentityError> {
        // The metadata endpoint merges, so other public metadata keys survive.
        let url = format!("{}/metadata", self.user_url(user_id));

        let response = self.http_client
            .patch(&url)
            .bearer_auth(&self.secret_key)
            .json(&json!({ "public_metadata": { "blocked": blocked } }))
            .send()
            .await
            .map_err(|e| IdentityError::RequestFailed(e.to_string()))?;

        Self::check(response, user_id).await?;
        tracing::info!(user_id = %user_id, blocked, "Updated blocked flag at identity provider");
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), IdentityError> {
        let response = self.http_client
            .delete(self.user_url(user_id))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| IdentityError::RequestFailed(e.to_string()))?;

        Self::check(response, user_id).await?;
        tracing::info!(user_id = %user_id, "Deleted user at identity provider");
        Ok(())
    }
}
