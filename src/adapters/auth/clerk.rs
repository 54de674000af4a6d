//! Clerk OIDC adapter for session token validation.
//!
//! This adapter implements the `SessionValidator` port using Clerk as the
//! identity provider. It validates session JWTs by:
//!
//! 1. Fetching JWKS from Clerk's well-known endpoint
//! 2. Validating the JWT signature against the public keys
//! 3. Validating issuer and expiry claims (plus `azp` when configured)
//! 4. Mapping claims to the domain `AuthenticatedUser` type
//!
//! Clerk session tokens carry no `aud` claim; the `azp` (authorized
//! party) claim is checked instead when an expected value is configured.
//!
//! # Example
//!
//! ```ignore
//! use billing_relay::adapters::auth::{ClerkConfig, ClerkSessionValidator};
//!
//! let config = ClerkConfig::new("https://example.clerk.accounts.dev")
//!     .with_authorized_party("https://app.example.com");
//! let validator = ClerkSessionValidator::new(config);
//! let user = validator.validate("eyJ...").await?;
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{
    decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, TokenData, Validation,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::domain::foundation::{AuthenticatedUser, AuthError, UserId};
use crate::ports::SessionValidator;

/// Configuration for the Clerk OIDC adapter.
#[derive(Debug, Clone)]
pub struct ClerkConfig {
    /// The issuer URL (e.g. "https://example.clerk.accounts.dev")
    /// Used for JWKS discovery and JWT issuer validation.
    pub issuer_url: String,

    /// Expected `azp` claim, if enforced. Clerk sets this to the origin
    /// of the frontend that minted the session token.
    pub authorized_party: Option<String>,

    /// Optional: how long to cache JWKS before refetching.
    /// Defaults to 1 hour if not specified.
    pub jwks_cache_duration: Option<Duration>,
}

impl ClerkConfig {
    /// Create a new configuration with required fields.
    pub fn new(issuer_url: impl Into<String>) -> Self {
        Self {
            issuer_url: issuer_url.into(),
            authorized_party: None,
            jwks_cache_duration: None,
        }
    }

    /// Enforce an expected `azp` claim.
    pub fn with_authorized_party(mut self, party: impl Into<String>) -> Self {
        self.authorized_party = Some(party.into());
        self
    }

    /// Set custom JWKS cache duration.
    pub fn with_cache_duration(mut self, duration: Duration) -> Self {
        self.jwks_cache_duration = Some(duration);
        self
    }

    /// Get the JWKS URL for this issuer.
    fn jwks_url(&self) -> String {
        format!(
            "{}/.well-known/jwks.json",
            self.issuer_url.trim_end_matches('/')
        )
    }
}

/// JWT claims structure for Clerk session tokens.
#[derive(Debug, Serialize, Deserialize)]
struct ClerkClaims {
    /// Subject - the user id
    sub: String,

    /// Issuer URL
    iss: String,

    /// Authorized party - frontend origin that minted the token
    #[serde(default)]
    azp: Option<String>,

    /// Expiry timestamp (Unix epoch seconds)
    exp: i64,

    /// Issued at timestamp
    #[serde(default)]
    iat: Option<i64>,

    /// User's email address, if the token template includes it
    #[serde(default)]
    email: Option<String>,

    /// User's display name, if the token template includes it
    #[serde(default)]
    name: Option<String>,
}

/// Cached JWKS with expiry tracking.
struct JwksCache {
    jwks: JwkSet,
    fetched_at: Instant,
    cache_duration: Duration,
}

impl JwksCache {
    fn new(jwks: JwkSet, cache_duration: Duration) -> Self {
        Self {
            jwks,
            fetched_at: Instant::now(),
            cache_duration,
        }
    }

    fn is_expired(&self) -> bool {
        self.fetched_at.elapsed() > self.cache_duration
    }
}

/// Clerk OIDC session validator.
///
/// Validates session JWTs against Clerk's JWKS and extracts user identity.
/// This is the production implementation of `SessionValidator`.
pub struct ClerkSessionValidator {
    config: ClerkConfig,
    http_client: reqwest::Client,
    jwks_cache: Arc<RwLock<Option<JwksCache>>>,
}

impl ClerkSessionValidator {
    /// Create a new Clerk validator.
    ///
    /// This does NOT fetch JWKS immediately - keys are fetched lazily on
    /// first validation to avoid blocking during startup.
    pub fn new(config: ClerkConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            http_client,
            jwks_cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Fetch JWKS from Clerk.
    async fn fetch_jwks(&self) -> Result<JwkSet, AuthError> {
        let url = self.config.jwks_url();

        tracing::debug!("Fetching JWKS from {}", url);

        let response = self.http_client.get(&url).send().await.map_err(|e| {
            tracing::error!("Failed to fetch JWKS: {}", e);
            AuthError::service_unavailable(format!("Failed to fetch JWKS: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!("JWKS endpoint returned {}", status);
            return Err(AuthError::service_unavailable(format!(
                "JWKS endpoint returned {}",
                status
            )));
        }

        let jwks: JwkSet = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse JWKS: {}", e);
            AuthError::service_unavailable(format!("Failed to parse JWKS: {}", e))
        })?;

        tracing::debug!("Fetched {} keys from JWKS", jwks.keys.len());

        Ok(jwks)
    }

    /// Get JWKS, using cache if available and not expired.
    async fn get_jwks(&self) -> Result<JwkSet, AuthError> {
        // Check cache first
        {
            let cache = self.jwks_cache.read().await;
            if let Some(ref cached) = *cache {
                if !cached.is_expired() {
                    return Ok(cached.jwks.clone());
                }
            }
        }

        // Cache miss or expired - fetch new JWKS
        let jwks = self.fetch_jwks().await?;

        // Update cache
        {
            let mut cache = self.jwks_cache.write().await;
            let duration = self
                .config
                .jwks_cache_duration
                .unwrap_or(Duration::from_secs(3600)); // Default 1 hour
            *cache = Some(JwksCache::new(jwks.clone(), duration));
        }

        Ok(jwks)
    }

    /// Find the decoding key for a JWT.
    fn find_decoding_key(
        &self,
        header: &jsonwebtoken::Header,
        jwks: &JwkSet,
    ) -> Result<(DecodingKey, Algorithm), AuthError> {
        // Get the key id from the JWT header
        let kid = header.kid.as_ref().ok_or_else(|| {
            tracing::warn!("JWT missing 'kid' header");
            AuthError::InvalidToken
        })?;

        // Find matching key in JWKS
        let jwk = jwks.find(kid).ok_or_else(|| {
            tracing::warn!("No matching key found for kid: {}", kid);
            AuthError::InvalidToken
        })?;

        // Determine algorithm
        let algorithm = match jwk.common.key_algorithm {
            Some(jsonwebtoken::jwk::KeyAlgorithm::RS256) => Algorithm::RS256,
            Some(jsonwebtoken::jwk::KeyAlgorithm::RS384) => Algorithm::RS384,
            Some(jsonwebtoken::jwk::KeyAlgorithm::RS512) => Algorithm::RS512,
            Some(other) => {
                tracing::warn!("Unsupported algorithm: {:?}", other);
                return Err(AuthError::InvalidToken);
            }
            None => {
                // Clerk signs session tokens with RS256
                Algorithm::RS256
            }
        };

        // Create decoding key
        let decoding_key = DecodingKey::from_jwk(jwk).map_err(|e| {
            tracing::warn!("Failed to create decoding key: {}", e);
            AuthError::InvalidToken
        })?;

        Ok((decoding_key, algorithm))
    }

    /// Validate a JWT and extract claims.
    fn validate_token(
        &self,
        token: &str,
        decoding_key: &DecodingKey,
        algorithm: Algorithm,
    ) -> Result<TokenData<ClerkClaims>, AuthError> {
        let mut validation = Validation::new(algorithm);

        // Validate issuer
        validation.set_issuer(&[&self.config.issuer_url]);

        // Clerk session tokens carry no `aud` claim
        validation.validate_aud = false;

        // Validate expiry (enabled by default)
        validation.validate_exp = true;

        // Require these claims to be present
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        decode::<ClerkClaims>(token, decoding_key, &validation).map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            match e.kind() {
                ErrorKind::ExpiredSignature => {
                    tracing::debug!("Token expired");
                    AuthError::TokenExpired
                }
                ErrorKind::InvalidIssuer => {
                    tracing::warn!("Invalid issuer in token");
                    AuthError::InvalidToken
                }
                _ => {
                    tracing::warn!("Token validation failed: {}", e);
                    AuthError::InvalidToken
                }
            }
        })
    }
}

#[async_trait]
impl SessionValidator for ClerkSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        // Decode header to get key id
        let header = decode_header(token).map_err(|e| {
            tracing::debug!("Failed to decode JWT header: {}", e);
            AuthError::InvalidToken
        })?;

        // Get JWKS (cached or fresh)
        let jwks = self.get_jwks().await?;

        // Find the matching key
        let (decoding_key, algorithm) = self.find_decoding_key(&header, &jwks)?;

        // Validate token and extract claims
        let token_data = self.validate_token(token, &decoding_key, algorithm)?;
        let claims = token_data.claims;

        // Double-check issuer (defense in depth)
        if claims.iss != self.config.issuer_url {
            tracing::warn!(
                "Issuer mismatch after validation: expected '{}', got '{}'",
                self.config.issuer_url,
                claims.iss
            );
            return Err(AuthError::InvalidToken);
        }

        // Check authorized party when configured
        if let Some(expected) = &self.config.authorized_party {
            if claims.azp.as_deref() != Some(expected.as_str()) {
                tracing::warn!(
                    "Authorized party mismatch: expected '{}', got '{:?}'",
                    expected,
                    claims.azp
                );
                return Err(AuthError::InvalidToken);
            }
        }

        // Create user id from subject
        let user_id = UserId::new(&claims.sub).map_err(|_| {
            tracing::warn!("Invalid user id in token: {}", claims.sub);
            AuthError::InvalidToken
        })?;

        Ok(AuthenticatedUser::new(user_id, claims.email, claims.name))
    }
}
