//! Clerk Backend API adapter for per-user metadata storage.
//!
//! Implements the `IdentityStore` port against the Clerk Backend API.
//! The relay's billing state lives in each user's `private_metadata`
//! object; reads fetch the user resource, writes replace the object
//! wholesale via PATCH.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::billing::MetadataMap;
use crate::domain::foundation::UserId;
use crate::ports::{IdentityError, IdentityStore};

/// Default base URL for the Clerk Backend API.
const DEFAULT_API_BASE_URL: &str = "https://api.clerk.com";

/// Clerk Backend API metadata store.
pub struct ClerkIdentityStore {
    secret_key: SecretString,
    api_base_url: String,
    http_client: reqwest::Client,
}

/// The subset of the Clerk user resource this adapter reads.
#[derive(Debug, Deserialize)]
struct ClerkUser {
    #[serde(default)]
    private_metadata: Option<MetadataMap>,
}

impl ClerkIdentityStore {
    /// Create a new store using the given Backend API secret key.
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: SecretString::new(secret_key.into()),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    fn user_url(&self, user_id: &UserId) -> String {
        format!("{}/v1/users/{}", self.api_base_url, user_id)
    }
}

#[async_trait]
impl IdentityStore for ClerkIdentityStore {
    async fn get_metadata(&self, user_id: &UserId) -> Result<MetadataMap, IdentityError> {
        let response = self
            .http_client
            .get(self.user_url(user_id))
            .bearer_auth(self.secret_key.expose_secret())
            .send()
            .await
            .map_err(|e| IdentityError::network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(IdentityError::UserNotFound);
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(user_id = %user_id, status, error = %body, "Clerk get user failed");
            return Err(IdentityError::api(Some(status), body));
        }

        let user: ClerkUser = response.json().await.map_err(|e| {
            IdentityError::api(None, format!("Failed to parse Clerk response: {}", e))
        })?;

        Ok(user.private_metadata.unwrap_or_default())
    }

    async fn set_metadata(
        &self,
        user_id: &UserId,
        metadata: MetadataMap,
    ) -> Result<(), IdentityError> {
        let body = serde_json::json!({ "private_metadata": metadata });

        let response = self
            .http_client
            .patch(self.user_url(user_id))
            .bearer_auth(self.secret_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| IdentityError::network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(IdentityError::UserNotFound);
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(user_id = %user_id, status, error = %body, "Clerk update metadata failed");
            return Err(IdentityError::api(Some(status), body));
        }

        Ok(())
    }
}
