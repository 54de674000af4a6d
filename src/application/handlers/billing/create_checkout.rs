//! CreateCheckoutHandler - Command handler for outbound checkout sessions.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::ports::{CheckoutSession, CreateCheckoutRequest, PaymentError, PaymentProvider};

use super::process_webhook::CHECKOUT_USER_KEY;

/// Command to create a checkout session for an authenticated caller.
#[derive(Debug, Clone)]
pub struct CreateCheckoutCommand {
    /// The verified caller identity.
    pub user_id: UserId,

    /// Caller-supplied checkout options (non-empty, validated upstream).
    pub options: serde_json::Map<String, serde_json::Value>,
}

/// Result of checkout creation.
#[derive(Debug, Clone)]
pub struct CheckoutCreated {
    /// The created session.
    pub session: CheckoutSession,

    /// Whether the provider echoed the injected identity back on the
    /// session metadata. False is anomalous but not fatal.
    pub identity_echoed: bool,
}

/// Build the success redirect URL for a frontend base.
///
/// The `{CHECKOUT_ID}` placeholder is substituted by the provider when
/// redirecting the customer.
pub fn success_redirect_url(frontend_base_url: &str) -> String {
    format!(
        "{}/success?checkout_id={{CHECKOUT_ID}}",
        frontend_base_url.trim_end_matches('/')
    )
}

/// Handler for creating checkout sessions.
///
/// Merges caller options with the configured success redirect and stamps
/// the caller's identity into the session metadata, overriding any
/// caller-supplied value of the same key.
pub struct CreateCheckoutHandler {
    payment_provider: Arc<dyn PaymentProvider>,
    success_url: String,
}

impl CreateCheckoutHandler {
    pub fn new(payment_provider: Arc<dyn PaymentProvider>, success_url: String) -> Self {
        Self {
            payment_provider,
            success_url,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateCheckoutCommand,
    ) -> Result<CheckoutCreated, PaymentError> {
        let mut options = cmd.options;

        // Lift any caller-supplied metadata object out of the options;
        // only its string values are forwarded.
        let mut metadata: HashMap<String, String> = HashMap::new();
        if let Some(serde_json::Value::Object(caller_metadata)) = options.remove("metadata") {
            for (key, value) in caller_metadata {
                match value {
                    serde_json::Value::String(s) => {
                        metadata.insert(key, s);
                    }
                    other => {
                        tracing::debug!(key, value = %other, "Dropping non-string metadata value");
                    }
                }
            }
        }

        // The identity link always wins over caller-supplied values
        metadata.insert(CHECKOUT_USER_KEY.to_string(), cmd.user_id.to_string());

        let request = CreateCheckoutRequest {
            options,
            success_url: self.success_url.clone(),
            metadata,
        };

        let session = self.payment_provider.create_checkout_session(request).await?;

        let identity_echoed = session
            .metadata
            .get(CHECKOUT_USER_KEY)
            .is_some_and(|echoed| echoed == cmd.user_id.as_str());

        if !identity_echoed {
            tracing::warn!(
                user_id = %cmd.user_id,
                session_id = %session.id,
                "Created checkout session does not echo the caller identity"
            );
        } else {
            tracing::info!(
                user_id = %cmd.user_id,
                session_id = %session.id,
                "Checkout session created"
            );
        }

        Ok(CheckoutCreated {
            session,
            identity_echoed,
        })
    }
}
