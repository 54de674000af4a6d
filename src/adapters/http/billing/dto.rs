//! HTTP DTOs (Data Transfer Objects) for the relay endpoints.
//!
//! These types define the JSON response structure for the API. Request
//! bodies are free-form options bundles and are handled as raw JSON.

use serde::Serialize;

use crate::application::handlers::catalog::ProductSummary;
use crate::domain::foundation::AuthenticatedUser;
use crate::ports::{CheckoutSession, PortalSession};

/// Response for checkout creation.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    /// Provider session id.
    pub id: String,

    /// Hosted checkout URL for the caller to redirect to.
    pub url: String,

    /// Warning attached when the created session did not echo the
    /// caller identity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl CheckoutResponse {
    /// Build from a created session, attaching the echo warning if needed.
    pub fn from_session(session: CheckoutSession, identity_echoed: bool) -> Self {
        Self {
            id: session.id,
            url: session.url,
            warning: (!identity_echoed)
                .then(|| "session metadata does not echo caller identity".to_string()),
        }
    }
}

/// Response for customer portal session creation.
#[derive(Debug, Clone, Serialize)]
pub struct PortalResponse {
    /// The customer portal URL.
    pub portal_url: String,
}

impl From<PortalSession> for PortalResponse {
    fn from(session: PortalSession) -> Self {
        Self {
            portal_url: session.url,
        }
    }
}

/// Simplified product served by the catalog endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub currency: String,
    pub features: Vec<String>,
    pub popular: bool,
}

impl From<ProductSummary> for ProductResponse {
    fn from(summary: ProductSummary) -> Self {
        Self {
            id: summary.id,
            name: summary.name,
            description: summary.description,
            price: summary.price,
            currency: summary.currency,
            features: summary.features,
            popular: summary.popular,
        }
    }
}

/// Response for the auth probe.
#[derive(Debug, Clone, Serialize)]
pub struct AuthProbeResponse {
    /// The verified caller identity.
    pub user_id: String,

    /// Email, when the session token carries it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl From<&AuthenticatedUser> for AuthProbeResponse {
    fn from(user: &AuthenticatedUser) -> Self {
        Self {
            user_id: user.id.to_string(),
            email: user.email.clone(),
        }
    }
}

/// Acknowledgement body for accepted webhook deliveries.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAckResponse {
    pub received: bool,
}

/// Standard error body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,

    /// Provider-supplied details (validation errors), verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    /// Creates a new error response.
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }

    /// Attaches provider details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}
