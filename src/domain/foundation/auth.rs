//! Authentication types for the domain layer.
//!
//! These types represent an authenticated user extracted from a bearer token.
//! They have **no external dependencies** - any identity provider (Clerk,
//! Auth0, Zitadel) can populate them via the `SessionValidator` port.
//!
//! # Design Decisions
//!
//! - `AuthenticatedUser` contains only the claims we actually use
//! - `AuthError` is domain-centric, not provider-specific
//! - Types are `Clone` for easy use in request handlers

use super::UserId;
use thiserror::Error;

/// Authenticated user extracted from a validated session token.
///
/// This is a **domain type** with no provider dependencies.
/// Session tokens don't always carry profile claims, so everything
/// beyond the identity itself is optional.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// The unique user identifier from the identity provider.
    pub id: UserId,

    /// User's email address, when the token carries it.
    pub email: Option<String>,

    /// Display name if available.
    pub display_name: Option<String>,
}

impl AuthenticatedUser {
    /// Creates a new authenticated user.
    ///
    /// This is typically called by the `SessionValidator` adapter after
    /// successfully validating a bearer token.
    pub fn new(id: UserId, email: Option<String>, display_name: Option<String>) -> Self {
        Self {
            id,
            email,
            display_name,
        }
    }
}

/// Authentication errors that can occur during token validation.
///
/// These errors are **domain-centric** - they describe what went wrong
/// from the application's perspective, not the identity provider's.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The token is missing, malformed, or has an invalid signature.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// The token has expired (separate from InvalidToken for specific handling).
    #[error("Token expired")]
    TokenExpired,

    /// Token is valid but the user no longer exists in the system.
    #[error("User not found")]
    UserNotFound,

    /// The authentication service is unavailable (network, config, etc.).
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    /// Creates a service unavailable error with a message.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Returns true if this is a transient error that may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::ServiceUnavailable(_))
    }
}
