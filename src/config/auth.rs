//! Authentication configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;

/// Authentication configuration (Clerk)
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Clerk issuer URL (e.g. `https://example.clerk.accounts.dev`)
    ///
    /// Used for JWKS discovery and `iss` claim validation.
    pub clerk_issuer: String,

    /// Clerk publishable key (pk_test_... / pk_live_...)
    ///
    /// Part of the deployment's configuration contract; the backend itself
    /// only validates its shape.
    pub clerk_publishable_key: String,

    /// Clerk secret key (sk_test_... / sk_live_...) for the Backend API
    pub clerk_secret_key: String,

    /// Expected `azp` (authorized party) claim, if enforced
    #[serde(default)]
    pub authorized_party: Option<String>,

    /// JWKS cache TTL in seconds
    #[serde(default = "default_jwks_cache_ttl")]
    pub jwks_cache_ttl_secs: u64,
}

impl AuthConfig {
    /// Get JWKS cache TTL as Duration
    pub fn jwks_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.jwks_cache_ttl_secs)
    }

    /// Validate authentication configuration
    ///
    /// In production, requires HTTPS for the issuer URL.
    /// In development, allows localhost with HTTP/HTTPS.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.clerk_issuer.is_empty() {
            return Err(ValidationError::MissingRequired("CLERK_ISSUER"));
        }
        if self.clerk_publishable_key.is_empty() {
            return Err(ValidationError::MissingRequired("CLERK_PUBLISHABLE_KEY"));
        }
        if self.clerk_secret_key.is_empty() {
            return Err(ValidationError::MissingRequired("CLERK_SECRET_KEY"));
        }

        // Verify key prefixes for safety
        if !self.clerk_publishable_key.starts_with("pk_") {
            return Err(ValidationError::InvalidClerkPublishableKey);
        }
        if !self.clerk_secret_key.starts_with("sk_") {
            return Err(ValidationError::InvalidClerkSecretKey);
        }

        // In production, require HTTPS
        if *environment == Environment::Production && !self.clerk_issuer.starts_with("https://") {
            return Err(ValidationError::IssuerMustBeHttps);
        }

        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            clerk_issuer: String::new(),
            clerk_publishable_key: String::new(),
            clerk_secret_key: String::new(),
            authorized_party: None,
            jwks_cache_ttl_secs: default_jwks_cache_ttl(),
        }
    }
}

fn default_jwks_cache_ttl() -> u64 {
    3600
}
