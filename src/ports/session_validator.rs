//! Session validation port for bearer token validation.
//!
//! This port defines the contract for validating access tokens and extracting
//! user identity. It is provider-agnostic - an implementation exists for
//! Clerk, a mock for testing, and others (Auth0, Zitadel) could be added.

use async_trait::async_trait;

use crate::domain::foundation::{AuthenticatedUser, AuthError};

/// Validates access tokens and extracts user identity.
///
/// This is the primary port for authentication. HTTP middleware uses this
/// to validate Bearer tokens and extract the authenticated user.
///
/// # Contract
///
/// Implementations must:
/// - Validate the token signature
/// - Validate issuer and expiry claims
/// - Return `AuthError::InvalidToken` for malformed/bad signature tokens
/// - Return `AuthError::TokenExpired` for expired tokens
/// - Return `AuthError::ServiceUnavailable` for transient errors
#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// Validate a bearer token and return the authenticated user.
    ///
    /// # Arguments
    ///
    /// * `token` - The raw token (without "Bearer " prefix)
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}
