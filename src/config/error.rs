//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid frontend base URL")]
    InvalidFrontendUrl,

    #[error("Clerk issuer must use HTTPS in production")]
    IssuerMustBeHttps,

    #[error("Invalid Clerk publishable key format")]
    InvalidClerkPublishableKey,

    #[error("Invalid Clerk secret key format")]
    InvalidClerkSecretKey,

    #[error("Invalid Polar access token format")]
    InvalidPolarToken,

    #[error("Polar environment must be \"sandbox\" or \"production\"")]
    InvalidPolarEnvironment,
}
