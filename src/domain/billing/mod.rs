//! Billing domain - entitlement state carried in identity-provider metadata.
//!
//! The identity provider is the sole store of persisted state; this module
//! owns the shape of that state and its two transitions (activation and
//! revocation).

mod metadata;
mod plan;

pub use metadata::{
    customer_id, BillingMetadata, MetadataMap, METADATA_CUSTOMER_ID, METADATA_PLAN,
    METADATA_STATUS, METADATA_SUBSCRIPTION_ID,
};
pub use plan::{EntitlementStatus, Plan};
