//! Polar payment provider adapter.
//!
//! Implements the `PaymentProvider` trait against the Polar REST API.
//! Handles checkout sessions, customer portal sessions, the product
//! catalog, and webhook verification.
//!
//! # Security
//!
//! - HMAC-SHA256 signature verification with constant-time comparison
//! - Timestamp validation (5-minute window) for replay attack prevention
//! - Secrets handled via `secrecy::SecretString`
//!
//! # Configuration
//!
//! ```ignore
//! let config = PolarConfig::new(access_token, webhook_secret)
//!     .with_environment(PolarEnvironment::Sandbox);
//! let adapter = PolarPaymentAdapter::new(config);
//! ```

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::ports::{
    Benefit, CheckoutSession, CreateCheckoutRequest, PaymentError, PaymentProvider, PortalSession,
    Product, ProductPrice, WebhookEvent, WebhookEventData, WebhookEventType, WebhookHeaders,
};

use super::webhook_types::{
    decode_secret, signed_content, ParsedSignature, PolarCheckoutSession, PolarCustomerSession,
    PolarProduct, PolarProductList, PolarSubscription, PolarWebhookEvent,
};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age for webhook deliveries (5 minutes).
const MAX_TIMESTAMP_AGE_SECS: i64 = 300;

/// Clock skew tolerance for future timestamps (60 seconds).
const MAX_FUTURE_TOLERANCE_SECS: i64 = 60;

/// Polar API environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolarEnvironment {
    /// Sandbox environment for development and testing.
    #[default]
    Sandbox,

    /// Production environment.
    Production,
}

impl PolarEnvironment {
    /// Base URL of the REST API for this environment.
    pub fn api_base_url(&self) -> &'static str {
        match self {
            PolarEnvironment::Sandbox => "https://sandbox-api.polar.sh",
            PolarEnvironment::Production => "https://api.polar.sh",
        }
    }
}

/// Polar API configuration.
#[derive(Clone)]
pub struct PolarConfig {
    /// Polar access token (polar_oat_... / polar_pat_...).
    access_token: SecretString,

    /// Webhook signing secret.
    webhook_secret: SecretString,

    /// Base URL for the Polar API.
    api_base_url: String,
}

impl PolarConfig {
    /// Create a new Polar configuration targeting the sandbox.
    pub fn new(access_token: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::new(access_token.into()),
            webhook_secret: SecretString::new(webhook_secret.into()),
            api_base_url: PolarEnvironment::default().api_base_url().to_string(),
        }
    }

    /// Select the API environment.
    pub fn with_environment(mut self, environment: PolarEnvironment) -> Self {
        self.api_base_url = environment.api_base_url().to_string();
        self
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// Polar payment provider adapter.
///
/// Implements `PaymentProvider` against the Polar REST API.
pub struct PolarPaymentAdapter {
    config: PolarConfig,
    http_client: reqwest::Client,
}

impl PolarPaymentAdapter {
    /// Create a new Polar adapter with the given configuration.
    pub fn new(config: PolarConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    /// Verify webhook signature using HMAC-SHA256 over `{id}.{ts}.{body}`.
    ///
    /// # Security
    ///
    /// - Uses constant-time comparison to prevent timing attacks
    /// - Validates timestamp to prevent replay attacks
    fn verify_signature(
        &self,
        payload: &[u8],
        headers: &WebhookHeaders,
        parsed: &ParsedSignature,
    ) -> Result<(), PaymentError> {
        // 1. Validate timestamp (prevent replay attacks)
        let now = chrono::Utc::now().timestamp();
        let age = now - parsed.timestamp;

        if age > MAX_TIMESTAMP_AGE_SECS {
            tracing::warn!(
                delivery_timestamp = parsed.timestamp,
                current_time = now,
                age_secs = age,
                "Webhook delivery too old - possible replay attack"
            );
            return Err(PaymentError::invalid_webhook(format!(
                "Delivery too old ({} seconds)",
                age
            )));
        }

        if age < -MAX_FUTURE_TOLERANCE_SECS {
            tracing::warn!(
                delivery_timestamp = parsed.timestamp,
                current_time = now,
                "Webhook delivery from future - clock skew or manipulation"
            );
            return Err(PaymentError::invalid_webhook(
                "Delivery timestamp in future",
            ));
        }

        // 2. Compute expected signature over the raw header values
        let content = signed_content(&headers.id, headers.timestamp.trim(), payload);
        let key = decode_secret(self.config.webhook_secret.expose_secret());

        let mut mac =
            HmacSha256::new_from_slice(&key).expect("HMAC can take key of any size");
        mac.update(&content);
        let expected = mac.finalize().into_bytes();
        let expected_bytes: &[u8] = expected.as_slice();

        // 3. Constant-time comparison against every candidate signature
        let authentic = parsed
            .signatures
            .iter()
            .any(|candidate| expected_bytes.ct_eq(candidate.as_slice()).unwrap_u8() == 1);

        if !authentic {
            tracing::warn!(delivery_id = %headers.id, "Invalid webhook signature");
            return Err(PaymentError::invalid_webhook("Invalid signature"));
        }

        Ok(())
    }

    /// Parse a Polar event and convert to port types.
    fn parse_event(
        &self,
        delivery_id: &str,
        payload: &[u8],
    ) -> Result<WebhookEvent, PaymentError> {
        let polar_event: PolarWebhookEvent = serde_json::from_slice(payload).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse webhook payload");
            PaymentError::invalid_webhook(format!("Invalid JSON: {}", e))
        })?;

        // Convert event type; unrecognized types fall through to Unknown
        let event_type = match polar_event.event_type.as_str() {
            "subscription.active" => WebhookEventType::SubscriptionActive,
            "subscription.revoked" => WebhookEventType::SubscriptionRevoked,
            "subscription.canceled" => WebhookEventType::SubscriptionCanceled,
            other => WebhookEventType::Unknown(other.to_string()),
        };

        let data = if polar_event.event_type.starts_with("subscription.") {
            let sub: PolarSubscription =
                serde_json::from_value(polar_event.data.clone()).map_err(|e| {
                    PaymentError::invalid_webhook(format!("Invalid subscription: {}", e))
                })?;

            WebhookEventData::Subscription {
                subscription_id: sub.id,
                customer_id: sub.customer_id.unwrap_or_default(),
                checkout_id: sub.checkout_id,
                status: sub.status,
            }
        } else {
            WebhookEventData::Raw {
                json: serde_json::to_string(&polar_event.data).unwrap_or_default(),
            }
        };

        Ok(WebhookEvent {
            id: delivery_id.to_string(),
            event_type,
            data,
        })
    }

    /// Build the checkout creation body from the request.
    ///
    /// Caller options are forwarded as-is; `success_url` and `metadata`
    /// are set last so they always win over caller-supplied values.
    fn build_checkout_body(request: &CreateCheckoutRequest) -> Value {
        let mut body = request.options.clone();
        body.insert(
            "success_url".to_string(),
            Value::String(request.success_url.clone()),
        );

        let metadata: serde_json::Map<String, Value> = request
            .metadata
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        body.insert("metadata".to_string(), Value::Object(metadata));

        Value::Object(body)
    }

    /// Map a non-success response to the right `PaymentError` variant.
    async fn error_from_response(
        operation: &'static str,
        response: reqwest::Response,
    ) -> PaymentError {
        let status = response.status();
        let body_text = response.text().await.unwrap_or_default();

        if status == reqwest::StatusCode::UNPROCESSABLE_ENTITY {
            // Polar validation errors carry a "detail" list
            let details = serde_json::from_str::<Value>(&body_text)
                .ok()
                .and_then(|v| v.get("detail").cloned());
            tracing::warn!(operation, status = %status, "Polar rejected request input");
            return PaymentError::validation(
                format!("Polar rejected {} input", operation),
                details,
            );
        }

        tracing::error!(operation, status = %status, error = %body_text, "Polar API error");
        PaymentError::api(
            Some(status.as_u16()),
            format!("Polar API error: {}", body_text),
        )
    }

    fn convert_checkout(session: PolarCheckoutSession) -> CheckoutSession {
        let url = session
            .url
            .unwrap_or_else(|| format!("https://polar.sh/checkout/{}", session.id));
        CheckoutSession {
            id: session.id,
            url,
            customer_id: session.customer_id,
            metadata: session.metadata,
        }
    }

    fn convert_product(product: PolarProduct) -> Product {
        Product {
            id: product.id,
            name: product.name,
            description: product.description,
            is_recurring: product.is_recurring,
            is_archived: product.is_archived,
            prices: product
                .prices
                .into_iter()
                .map(|p| ProductPrice {
                    amount_minor: p.amount_minor(),
                    currency: p.currency_code().map(str::to_string),
                })
                .collect(),
            benefits: product
                .benefits
                .into_iter()
                .filter_map(|b| b.description)
                .map(|description| Benefit { description })
                .collect(),
        }
    }
}

#[async_trait]
impl PaymentProvider for PolarPaymentAdapter {
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let url = format!("{}/v1/checkouts/", self.config.api_base_url);
        let body = Self::build_checkout_body(&request);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.config.access_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response("create_checkout_session", response).await);
        }

        let session: PolarCheckoutSession = response.json().await.map_err(|e| {
            PaymentError::api(None, format!("Failed to parse Polar response: {}", e))
        })?;

        Ok(Self::convert_checkout(session))
    }

    async fn get_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, PaymentError> {
        let url = format!("{}/v1/checkouts/{}", self.config.api_base_url, session_id);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(self.config.access_token.expose_secret())
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response("get_checkout_session", response).await);
        }

        let session: PolarCheckoutSession = response.json().await.map_err(|e| {
            PaymentError::api(None, format!("Failed to parse Polar response: {}", e))
        })?;

        Ok(Self::convert_checkout(session))
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
    ) -> Result<PortalSession, PaymentError> {
        let url = format!("{}/v1/customer-sessions/", self.config.api_base_url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.config.access_token.expose_secret())
            .json(&serde_json::json!({ "customer_id": customer_id }))
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response("create_portal_session", response).await);
        }

        let session: PolarCustomerSession = response.json().await.map_err(|e| {
            PaymentError::api(None, format!("Failed to parse Polar response: {}", e))
        })?;

        Ok(PortalSession {
            id: session.id,
            url: session.customer_portal_url,
        })
    }

    async fn list_products(&self) -> Result<Vec<Product>, PaymentError> {
        let url = format!(
            "{}/v1/products/?is_archived=false&is_recurring=true&limit=100",
            self.config.api_base_url
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(self.config.access_token.expose_secret())
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response("list_products", response).await);
        }

        let list: PolarProductList = response.json().await.map_err(|e| {
            PaymentError::api(None, format!("Failed to parse Polar response: {}", e))
        })?;

        Ok(list.items.into_iter().map(Self::convert_product).collect())
    }

    async fn verify_webhook(
        &self,
        payload: &[u8],
        headers: &WebhookHeaders,
    ) -> Result<WebhookEvent, PaymentError> {
        // 1. Parse signature headers
        let parsed = ParsedSignature::parse(&headers.id, &headers.timestamp, &headers.signature)
            .map_err(|e| {
                tracing::warn!(error = %e, "Failed to parse webhook signature headers");
                PaymentError::invalid_webhook(e.to_string())
            })?;

        // 2. Verify signature (includes timestamp validation)
        self.verify_signature(payload, headers, &parsed)?;

        // 3. Parse and convert event
        let event = self.parse_event(&headers.id, payload)?;

        tracing::info!(
            delivery_id = %event.id,
            event_type = ?event.event_type,
            "Webhook signature verified"
        );

        Ok(event)
    }
}
