//! Mock authentication adapters for testing.
//!
//! These adapters implement the `SessionValidator` and `IdentityStore`
//! ports for use in tests, avoiding the need for a real identity provider.
//!
//! # Example
//!
//! ```ignore
//! use billing_relay::adapters::auth::MockSessionValidator;
//!
//! let validator = MockSessionValidator::new().with_test_user("valid-token", "user_123");
//! let result = validator.validate("valid-token").await;
//! assert!(result.is_ok());
//! ```

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::billing::MetadataMap;
use crate::domain::foundation::{AuthenticatedUser, AuthError, UserId};
use crate::ports::{IdentityError, IdentityStore, SessionValidator};

/// Mock session validator for testing.
///
/// Stores a map of tokens to users. Tokens not in the map return
/// `InvalidToken`.
#[derive(Debug, Default)]
pub struct MockSessionValidator {
    /// Map of valid tokens to their associated users
    tokens: RwLock<HashMap<String, AuthenticatedUser>>,
    /// Optional error to return for all validations (for error testing)
    force_error: RwLock<Option<AuthError>>,
}

impl MockSessionValidator {
    /// Creates a new empty mock validator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a valid token that maps to a user.
    pub fn with_user(self, token: impl Into<String>, user: AuthenticatedUser) -> Self {
        self.tokens.write().unwrap().insert(token.into(), user);
        self
    }

    /// Adds a valid token with a simple test user.
    ///
    /// Convenience method that creates a user with the given id.
    pub fn with_test_user(self, token: impl Into<String>, user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        let user = AuthenticatedUser::new(
            UserId::new(&user_id).unwrap(),
            Some(format!("{}@test.example.com", user_id)),
            None,
        );
        self.with_user(token, user)
    }

    /// Forces all validations to return the specified error.
    pub fn with_error(self, error: AuthError) -> Self {
        *self.force_error.write().unwrap() = Some(error);
        self
    }
}

#[async_trait]
impl SessionValidator for MockSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        // Check for forced error
        if let Some(error) = self.force_error.read().unwrap().clone() {
            return Err(error);
        }

        // Look up the token
        self.tokens
            .read()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}

/// Mock identity store for testing.
///
/// Holds per-user metadata objects in memory. Unknown users return
/// `UserNotFound`.
#[derive(Debug, Default)]
pub struct MockIdentityStore {
    users: RwLock<HashMap<String, MetadataMap>>,
    /// Optional error to return for all writes (for error testing)
    fail_writes: RwLock<Option<IdentityError>>,
}

impl MockIdentityStore {
    /// Creates a new empty mock store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user with an empty metadata object.
    pub fn with_user(self, user_id: impl Into<String>) -> Self {
        self.users
            .write()
            .unwrap()
            .insert(user_id.into(), MetadataMap::new());
        self
    }

    /// Registers a user with the given metadata object.
    pub fn with_metadata(self, user_id: impl Into<String>, metadata: MetadataMap) -> Self {
        self.users.write().unwrap().insert(user_id.into(), metadata);
        self
    }

    /// Forces all writes to fail with the specified error.
    pub fn with_failing_writes(self, error: IdentityError) -> Self {
        *self.fail_writes.write().unwrap() = Some(error);
        self
    }

    /// Returns the stored metadata for a user, for test assertions.
    pub fn metadata_for(&self, user_id: &str) -> Option<MetadataMap> {
        self.users.read().unwrap().get(user_id).cloned()
    }
}

#[async_trait]
impl IdentityStore for MockIdentityStore {
    async fn get_metadata(&self, user_id: &UserId) -> Result<MetadataMap, IdentityError> {
        self.users
            .read()
            .unwrap()
            .get(user_id.as_str())
            .cloned()
            .ok_or(IdentityError::UserNotFound)
    }

    async fn set_metadata(
        &self,
        user_id: &UserId,
        metadata: MetadataMap,
    ) -> Result<(), IdentityError> {
        if let Some(error) = self.fail_writes.read().unwrap().clone() {
            return Err(error);
        }

        let mut users = self.users.write().unwrap();
        match users.get_mut(user_id.as_str()) {
            Some(existing) => {
                *existing = metadata;
                Ok(())
            }
            None => Err(IdentityError::UserNotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn mock_validator_accepts_registered_token() {
        let validator = MockSessionValidator::new().with_test_user("token-1", "user_1");
        let user = validator.validate("token-1").await.unwrap();
        assert_eq!(user.id.as_str(), "user_1");
    }

    #[tokio::test]
    async fn mock_validator_rejects_unknown_token() {
        let validator = MockSessionValidator::new();
        assert!(matches!(
            validator.validate("nope").await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn mock_validator_forced_error() {
        let validator =
            MockSessionValidator::new().with_error(AuthError::service_unavailable("down"));
        assert!(matches!(
            validator.validate("anything").await,
            Err(AuthError::ServiceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn mock_store_set_replaces_wholesale() {
        let store = MockIdentityStore::new().with_metadata(
            "user_1",
            json!({"old": true}).as_object().unwrap().clone(),
        );
        let user = UserId::new("user_1").unwrap();

        let replacement = json!({"plan": "pro"}).as_object().unwrap().clone();
        store.set_metadata(&user, replacement).await.unwrap();

        let stored = store.metadata_for("user_1").unwrap();
        assert!(!stored.contains_key("old"));
        assert_eq!(stored["plan"], "pro");
    }

    #[tokio::test]
    async fn mock_store_unknown_user() {
        let store = MockIdentityStore::new();
        let user = UserId::new("ghost").unwrap();
        assert!(matches!(
            store.get_metadata(&user).await,
            Err(IdentityError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn mock_store_forced_write_failure() {
        let store = MockIdentityStore::new()
            .with_user("user_1")
            .with_failing_writes(IdentityError::network("down"));
        let user = UserId::new("user_1").unwrap();

        let result = store.set_metadata(&user, MetadataMap::new()).await;
        assert!(matches!(result, Err(IdentityError::Network(_))));
    }
}
