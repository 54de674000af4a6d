//! Plan and entitlement status value objects.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Plan a user is entitled to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    /// Paid plan granted by an active subscription.
    Pro,

    /// Default plan after revocation (or for users who never paid).
    Free,
}

impl Plan {
    /// The wire value stored in identity-provider metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Pro => "pro",
            Plan::Free => "free",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Entitlement status mirrored from the subscription lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntitlementStatus {
    /// Subscription is active; paid features unlocked.
    Active,

    /// Subscription was revoked; access withdrawn.
    Revoked,
}

impl EntitlementStatus {
    /// The wire value stored in identity-provider metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntitlementStatus::Active => "active",
            EntitlementStatus::Revoked => "revoked",
        }
    }
}

impl fmt::Display for EntitlementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
