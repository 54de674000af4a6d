//! Billing metadata value object and its state transitions.
//!
//! The identity provider stores an arbitrary JSON object per user. This
//! relay owns four keys in that object: `subscriptionId`, `customerId`,
//! `plan`, and `status`. Two transitions exist:
//!
//! - **Activation** replaces the whole object with exactly those four keys.
//! - **Revocation** merges into the freshly-read object: a previously
//!   stored `subscriptionId` wins over the event's, `customerId` is
//!   overwritten, and plan/status drop to free/revoked. Keys this relay
//!   does not own survive the merge.

use serde_json::Value;

use super::{EntitlementStatus, Plan};

/// Metadata key for the provider subscription id.
pub const METADATA_SUBSCRIPTION_ID: &str = "subscriptionId";

/// Metadata key for the provider customer id.
pub const METADATA_CUSTOMER_ID: &str = "customerId";

/// Metadata key for the entitlement plan.
pub const METADATA_PLAN: &str = "plan";

/// Metadata key for the entitlement status.
pub const METADATA_STATUS: &str = "status";

/// The raw per-user metadata object as stored by the identity provider.
pub type MetadataMap = serde_json::Map<String, Value>;

/// The billing fields this relay writes into user metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingMetadata {
    pub subscription_id: String,
    pub customer_id: String,
    pub plan: Plan,
    pub status: EntitlementStatus,
}

impl BillingMetadata {
    /// Billing state after a subscription became active.
    pub fn activated(
        subscription_id: impl Into<String>,
        customer_id: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            customer_id: customer_id.into(),
            plan: Plan::Pro,
            status: EntitlementStatus::Active,
        }
    }

    /// Billing state after a subscription was revoked.
    ///
    /// A `subscriptionId` already present in `existing` is preserved;
    /// otherwise the event's id is recorded. The event's customer id
    /// always wins.
    pub fn revoked(
        existing: &MetadataMap,
        event_subscription_id: impl Into<String>,
        customer_id: impl Into<String>,
    ) -> Self {
        let prior_subscription_id = existing
            .get(METADATA_SUBSCRIPTION_ID)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Self {
            subscription_id: prior_subscription_id.unwrap_or_else(|| event_subscription_id.into()),
            customer_id: customer_id.into(),
            plan: Plan::Free,
            status: EntitlementStatus::Revoked,
        }
    }

    /// Produce a fresh metadata object holding exactly the billing fields.
    ///
    /// Used by the activation transition, which overwrites the stored
    /// object wholesale.
    pub fn into_map(self) -> MetadataMap {
        let mut map = MetadataMap::new();
        self.write_into(&mut map);
        map
    }

    /// Merge the billing fields into an existing metadata object.
    ///
    /// Used by the revocation transition; keys not owned by this relay
    /// are left untouched.
    pub fn merge_into(self, mut existing: MetadataMap) -> MetadataMap {
        self.write_into(&mut existing);
        existing
    }

    fn write_into(self, map: &mut MetadataMap) {
        map.insert(
            METADATA_SUBSCRIPTION_ID.to_string(),
            Value::String(self.subscription_id),
        );
        map.insert(
            METADATA_CUSTOMER_ID.to_string(),
            Value::String(self.customer_id),
        );
        map.insert(
            METADATA_PLAN.to_string(),
            Value::String(self.plan.as_str().to_string()),
        );
        map.insert(
            METADATA_STATUS.to_string(),
            Value::String(self.status.as_str().to_string()),
        );
    }
}

/// Read the stored customer id out of a metadata object, if any.
pub fn customer_id(metadata: &MetadataMap) -> Option<&str> {
    metadata
        .get(METADATA_CUSTOMER_ID)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}
