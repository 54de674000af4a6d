//! Payment provider port for external payment processing.
//!
//! Defines the contract for the payments gateway integration (e.g. Polar).
//! Implementations handle checkout/portal session creation, catalog reads,
//! and webhook signature verification.
//!
//! # Design
//!
//! - **Gateway agnostic**: the interface carries no provider wire types
//! - **Stateless**: nothing is cached or tracked locally
//! - **Typed errors**: input validation, upstream failure, and network
//!   failure are distinct variants, so HTTP mapping never inspects strings

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Port for the payment provider integration.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a checkout session for the given options bundle.
    ///
    /// The request's metadata must be attached verbatim to the session so
    /// webhook processing can link it back to a user identity.
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Fetch an existing checkout session by provider id.
    async fn get_checkout_session(&self, session_id: &str)
        -> Result<CheckoutSession, PaymentError>;

    /// Create a customer portal session for subscription self-management.
    ///
    /// Returns a URL the customer can visit to manage their subscription.
    async fn create_portal_session(&self, customer_id: &str)
        -> Result<PortalSession, PaymentError>;

    /// List purchasable products (active, recurring, non-archived).
    async fn list_products(&self) -> Result<Vec<Product>, PaymentError>;

    /// Verify a webhook signature and parse the event.
    ///
    /// Returns the parsed event if valid, `PaymentError::InvalidWebhook`
    /// if the signature (or payload) is not.
    async fn verify_webhook(
        &self,
        payload: &[u8],
        headers: &WebhookHeaders,
    ) -> Result<WebhookEvent, PaymentError>;
}

/// Signature-bearing headers accompanying a webhook delivery.
///
/// The standard-webhooks scheme signs `{id}.{timestamp}.{payload}`, so all
/// three raw header values are needed for verification.
#[derive(Debug, Clone)]
pub struct WebhookHeaders {
    /// Unique delivery id (`webhook-id`).
    pub id: String,

    /// Raw delivery timestamp (`webhook-timestamp`).
    pub timestamp: String,

    /// Space-delimited `v1,<base64>` signature list (`webhook-signature`).
    pub signature: String,
}

/// Request to create a checkout session.
#[derive(Debug, Clone)]
pub struct CreateCheckoutRequest {
    /// Caller-supplied checkout options, forwarded to the provider as-is.
    pub options: serde_json::Map<String, serde_json::Value>,

    /// Redirect target after a completed checkout.
    pub success_url: String,

    /// Metadata attached to the session. The identity link lives here and
    /// must override any same-named key inside `options`.
    pub metadata: HashMap<String, String>,
}

/// Checkout session created by the payment provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider's session id.
    pub id: String,

    /// URL for the customer to complete checkout.
    pub url: String,

    /// Provider customer id, once known.
    pub customer_id: Option<String>,

    /// Metadata echoed back by the provider.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Portal session for subscription management.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalSession {
    /// Provider's session id.
    pub id: String,

    /// URL for the customer to access the portal.
    pub url: String,
}

/// Catalog product as returned by the payment provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Provider's product id.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Marketing description.
    pub description: Option<String>,

    /// Whether the product bills on a recurring interval.
    pub is_recurring: bool,

    /// Whether the product has been archived.
    pub is_archived: bool,

    /// Prices attached to the product, in catalog order.
    pub prices: Vec<ProductPrice>,

    /// Benefits granted by the product.
    pub benefits: Vec<Benefit>,
}

/// A product price, normalized from the provider's wire shape.
///
/// Either field may be absent upstream; downstream consumers supply
/// defaults rather than failing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductPrice {
    /// Amount in minor units (cents).
    pub amount_minor: Option<i64>,

    /// ISO currency code.
    pub currency: Option<String>,
}

/// A benefit granted by a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Benefit {
    /// Human-readable benefit description.
    pub description: String,
}

/// Webhook event from the payment provider, after verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Delivery id from the provider.
    pub id: String,

    /// Event type.
    pub event_type: WebhookEventType,

    /// Event payload.
    pub data: WebhookEventData,
}

/// Subscription lifecycle events this relay recognizes.
///
/// Dispatch is an enum switch with an explicit catch-all; new provider
/// event types land in `Unknown` and are acknowledged without action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    /// Subscription became active.
    SubscriptionActive,

    /// Subscription was revoked (access withdrawn).
    SubscriptionRevoked,

    /// Subscription was canceled but remains active until period end.
    SubscriptionCanceled,

    /// Any other event type.
    Unknown(String),
}

/// Webhook event payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WebhookEventData {
    /// Subscription state carried by subscription.* events.
    #[serde(rename = "subscription")]
    Subscription {
        subscription_id: String,
        customer_id: String,
        /// Reference back to the originating checkout session.
        checkout_id: Option<String>,
        status: String,
    },

    /// Raw JSON for event types we don't model.
    #[serde(rename = "raw")]
    Raw { json: String },
}

/// Errors from payment provider operations.
#[derive(Debug, Clone, Error)]
pub enum PaymentError {
    /// The provider rejected the request input.
    #[error("provider rejected input: {message}")]
    Validation {
        message: String,
        /// Provider-supplied validation details, verbatim.
        details: Option<serde_json::Value>,
    },

    /// The provider returned a non-validation failure.
    #[error("provider API error{}: {message}", .status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    Api {
        /// HTTP status returned by the provider, if any.
        status: Option<u16>,
        message: String,
    },

    /// Transport-level failure reaching the provider.
    #[error("provider unreachable: {0}")]
    Network(String),

    /// Webhook signature or payload could not be verified.
    #[error("invalid webhook: {0}")]
    InvalidWebhook(String),
}

impl PaymentError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>, details: Option<serde_json::Value>) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }

    /// Create an API error.
    pub fn api(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Create an invalid webhook error.
    pub fn invalid_webhook(message: impl Into<String>) -> Self {
        Self::InvalidWebhook(message.into())
    }
}
