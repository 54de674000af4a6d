//! Identity store port for per-user metadata at the identity provider.
//!
//! The identity provider is the only store of persisted state in this
//! system. This port exposes exactly the operations the relay needs:
//! read the metadata object and overwrite it wholesale.
//!
//! # Concurrency
//!
//! `get_metadata` followed by `set_metadata` is **not** atomic. Concurrent
//! webhook deliveries for the same user can interleave between the read
//! and the write; that race is accepted behavior for this relay.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::billing::MetadataMap;
use crate::domain::foundation::UserId;

/// Reads and overwrites per-user metadata at the identity provider.
///
/// # Contract
///
/// Implementations must:
/// - Return the full metadata object (empty map if the user has none)
/// - Replace the stored object wholesale on `set_metadata`
/// - Return `IdentityError::UserNotFound` if the user doesn't exist
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Fetch the metadata object stored for a user.
    async fn get_metadata(&self, user_id: &UserId) -> Result<MetadataMap, IdentityError>;

    /// Overwrite the metadata object stored for a user.
    async fn set_metadata(
        &self,
        user_id: &UserId,
        metadata: MetadataMap,
    ) -> Result<(), IdentityError>;
}

/// Errors from identity store operations.
#[derive(Debug, Clone, Error)]
pub enum IdentityError {
    /// No user exists with the given id.
    #[error("User not found")]
    UserNotFound,

    /// The identity provider rejected the request.
    #[error("Identity provider error{}: {message}", .status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    Api {
        /// HTTP status returned by the provider, if any.
        status: Option<u16>,
        message: String,
    },

    /// Transport-level failure reaching the identity provider.
    #[error("Identity provider unreachable: {0}")]
    Network(String),
}

impl IdentityError {
    /// Creates an API error.
    pub fn api(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }
}
