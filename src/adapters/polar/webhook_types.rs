//! Polar-specific wire types for webhook and API payloads.
//!
//! These types represent Polar API objects as they arrive over the wire.
//! They are designed to:
//! - Parse actual Polar JSON accurately
//! - Tolerate the two price field-naming conventions Polar has shipped
//! - Map to port types for further processing

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

// ════════════════════════════════════════════════════════════════════════════════
// Signature Parsing (standard-webhooks scheme)
// ════════════════════════════════════════════════════════════════════════════════

/// Error parsing the webhook signature headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureParseError {
    /// `webhook-id` header is empty or missing.
    MissingId,
    /// `webhook-timestamp` header is empty or missing.
    MissingTimestamp,
    /// Invalid timestamp format.
    InvalidTimestamp,
    /// No `v1` signature present in `webhook-signature`.
    MissingSignature,
    /// A signature entry was not valid base64.
    InvalidSignatureFormat,
}

impl std::fmt::Display for SignatureParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingId => write!(f, "Missing webhook-id header"),
            Self::MissingTimestamp => write!(f, "Missing webhook-timestamp header"),
            Self::InvalidTimestamp => write!(f, "Invalid webhook-timestamp format"),
            Self::MissingSignature => write!(f, "Missing v1 signature in webhook-signature"),
            Self::InvalidSignatureFormat => {
                write!(f, "Invalid signature format (not valid base64)")
            }
        }
    }
}

impl std::error::Error for SignatureParseError {}

/// Parsed webhook signature material.
///
/// The `webhook-signature` header carries one or more space-delimited
/// entries of the form `v1,<base64 signature>`. A delivery is authentic if
/// any one of them matches the expected HMAC.
///
/// # Example
///
/// ```ignore
/// let parsed = ParsedSignature::parse("wh_1", "1704067200", "v1,MEYC...")?;
/// assert_eq!(parsed.timestamp, 1704067200);
/// ```
#[derive(Debug, Clone)]
pub struct ParsedSignature {
    /// Unix timestamp when the provider generated the delivery.
    pub timestamp: i64,

    /// Decoded candidate signatures (HMAC-SHA256, base64 on the wire).
    pub signatures: Vec<Vec<u8>>,
}

impl ParsedSignature {
    /// Parse the three signature-bearing header values.
    pub fn parse(id: &str, timestamp: &str, signature: &str) -> Result<Self, SignatureParseError> {
        if id.trim().is_empty() {
            return Err(SignatureParseError::MissingId);
        }
        if timestamp.trim().is_empty() {
            return Err(SignatureParseError::MissingTimestamp);
        }

        let timestamp: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| SignatureParseError::InvalidTimestamp)?;

        let mut signatures = Vec::new();
        for entry in signature.split_whitespace() {
            let Some((version, encoded)) = entry.split_once(',') else {
                continue;
            };
            // Only v1 (HMAC-SHA256) is supported; skip other versions for
            // forward compatibility.
            if version != "v1" {
                continue;
            }
            let decoded = BASE64
                .decode(encoded)
                .map_err(|_| SignatureParseError::InvalidSignatureFormat)?;
            signatures.push(decoded);
        }

        if signatures.is_empty() {
            return Err(SignatureParseError::MissingSignature);
        }

        Ok(Self {
            timestamp,
            signatures,
        })
    }
}

/// The content the provider signs: `{id}.{timestamp}.{payload}`.
///
/// The raw header values are used verbatim; re-formatting the timestamp
/// would break verification for non-canonical encodings.
pub fn signed_content(id: &str, timestamp: &str, payload: &[u8]) -> Vec<u8> {
    let mut content = Vec::with_capacity(id.len() + timestamp.len() + payload.len() + 2);
    content.extend_from_slice(id.as_bytes());
    content.push(b'.');
    content.extend_from_slice(timestamp.as_bytes());
    content.push(b'.');
    content.extend_from_slice(payload);
    content
}

/// Decode the shared webhook secret into HMAC key bytes.
///
/// Standard-webhooks secrets are base64 behind an optional `whsec_`
/// prefix. Secrets that don't decode as base64 are used as raw bytes.
pub fn decode_secret(secret: &str) -> Vec<u8> {
    let trimmed = secret.strip_prefix("whsec_").unwrap_or(secret);
    BASE64
        .decode(trimmed)
        .unwrap_or_else(|_| trimmed.as_bytes().to_vec())
}

/// Encode bytes as base64 (test helpers and diagnostics).
pub fn base64_encode(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

// ════════════════════════════════════════════════════════════════════════════════
// Polar Event Types
// ════════════════════════════════════════════════════════════════════════════════

/// Raw Polar webhook event envelope as received from the API.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolarWebhookEvent {
    /// Event type (e.g. "subscription.active").
    #[serde(rename = "type")]
    pub event_type: String,

    /// The object affected by this event.
    pub data: serde_json::Value,
}

/// Polar Subscription object (webhook payload shape).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolarSubscription {
    /// Unique subscription identifier.
    pub id: String,

    /// Subscription status (active, canceled, revoked, ...).
    pub status: String,

    /// Customer owning this subscription.
    #[serde(default)]
    pub customer_id: Option<String>,

    /// Checkout session that created this subscription.
    #[serde(default)]
    pub checkout_id: Option<String>,

    /// Custom metadata attached to the subscription.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Polar Checkout Session object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolarCheckoutSession {
    /// Unique session identifier.
    pub id: String,

    /// Hosted checkout URL.
    #[serde(default)]
    pub url: Option<String>,

    /// Session status (open, confirmed, succeeded, expired).
    #[serde(default)]
    pub status: Option<String>,

    /// Customer id, once known.
    #[serde(default)]
    pub customer_id: Option<String>,

    /// Custom metadata attached to the session.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Polar customer session (portal) response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolarCustomerSession {
    /// Unique session identifier.
    pub id: String,

    /// Hosted portal URL for the customer.
    pub customer_portal_url: String,
}

/// Paginated product listing response.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PolarProductList {
    /// Products on this page.
    #[serde(default)]
    pub items: Vec<PolarProduct>,
}

/// Polar Product object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolarProduct {
    /// Unique product identifier.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Marketing description.
    #[serde(default)]
    pub description: Option<String>,

    /// Whether the product bills on a recurring interval.
    #[serde(default)]
    pub is_recurring: bool,

    /// Whether the product has been archived.
    #[serde(default)]
    pub is_archived: bool,

    /// Prices attached to the product.
    #[serde(default)]
    pub prices: Vec<PolarPrice>,

    /// Benefits granted by the product.
    #[serde(default)]
    pub benefits: Vec<PolarBenefit>,
}

/// Polar price object.
///
/// Polar has shipped two field-naming conventions for fixed prices
/// (`price_amount`/`price_currency` and `amount`/`currency`); both are
/// accepted here and resolved by the accessors.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PolarPrice {
    /// Amount in minor units (newer convention).
    #[serde(default)]
    pub price_amount: Option<i64>,

    /// Amount in minor units (older convention).
    #[serde(default)]
    pub amount: Option<i64>,

    /// Currency code (newer convention).
    #[serde(default)]
    pub price_currency: Option<String>,

    /// Currency code (older convention).
    #[serde(default)]
    pub currency: Option<String>,
}

impl PolarPrice {
    /// Amount in minor units, whichever convention is present.
    pub fn amount_minor(&self) -> Option<i64> {
        self.price_amount.or(self.amount)
    }

    /// Currency code, whichever convention is present.
    pub fn currency_code(&self) -> Option<&str> {
        self.price_currency
            .as_deref()
            .or(self.currency.as_deref())
    }
}

/// Polar benefit object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolarBenefit {
    /// Human-readable benefit description.
    #[serde(default)]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    // ════════════════════════════════════════════════════════════════════════════
    // Signature Parsing Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn parse_signature_valid() {
        let sig = BASE64.encode(b"some-signature-bytes");
        let parsed =
            ParsedSignature::parse("wh_1", "1704067200", &format!("v1,{}", sig)).unwrap();

        assert_eq!(parsed.timestamp, 1704067200);
        assert_eq!(parsed.signatures.len(), 1);
        assert_eq!(parsed.signatures[0], b"some-signature-bytes");
    }

    #[test]
    fn parse_signature_multiple_entries() {
        let first = BASE64.encode(b"first");
        let second = BASE64.encode(b"second");
        let header = format!("v1,{} v1,{}", first, second);

        let parsed = ParsedSignature::parse("wh_1", "1704067200", &header).unwrap();
        assert_eq!(parsed.signatures.len(), 2);
    }

    #[test]
    fn parse_signature_skips_unknown_versions() {
        let v1 = BASE64.encode(b"real");
        let header = format!("v2,not-checked v1,{}", v1);

        let parsed = ParsedSignature::parse("wh_1", "1704067200", &header).unwrap();
        assert_eq!(parsed.signatures.len(), 1);
        assert_eq!(parsed.signatures[0], b"real");
    }

    #[test]
    fn parse_signature_missing_id() {
        let result = ParsedSignature::parse("", "1704067200", "v1,aGVsbG8=");
        assert!(matches!(result, Err(SignatureParseError::MissingId)));
    }

    #[test]
    fn parse_signature_missing_timestamp() {
        let result = ParsedSignature::parse("wh_1", "", "v1,aGVsbG8=");
        assert!(matches!(result, Err(SignatureParseError::MissingTimestamp)));
    }

    #[test]
    fn parse_signature_invalid_timestamp() {
        let result = ParsedSignature::parse("wh_1", "not-a-number", "v1,aGVsbG8=");
        assert!(matches!(result, Err(SignatureParseError::InvalidTimestamp)));
    }

    #[test]
    fn parse_signature_no_v1_entry() {
        let result = ParsedSignature::parse("wh_1", "1704067200", "v2,aGVsbG8=");
        assert!(matches!(result, Err(SignatureParseError::MissingSignature)));

        let result = ParsedSignature::parse("wh_1", "1704067200", "");
        assert!(matches!(result, Err(SignatureParseError::MissingSignature)));
    }

    #[test]
    fn parse_signature_invalid_base64() {
        let result = ParsedSignature::parse("wh_1", "1704067200", "v1,!!not-base64!!");
        assert!(matches!(
            result,
            Err(SignatureParseError::InvalidSignatureFormat)
        ));
    }

    #[test]
    fn signed_content_joins_with_dots() {
        let content = signed_content("wh_1", "1704067200", b"{}");
        assert_eq!(content, b"wh_1.1704067200.{}");
    }

    #[test]
    fn decode_secret_strips_prefix_and_decodes() {
        let secret = format!("whsec_{}", BASE64.encode(b"raw-key"));
        assert_eq!(decode_secret(&secret), b"raw-key");
    }

    #[test]
    fn decode_secret_falls_back_to_raw_bytes() {
        assert_eq!(decode_secret("not base64 at all!"), b"not base64 at all!");
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Event Parsing Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn parse_subscription_active_event() {
        let json = r#"{
            "type": "subscription.active",
            "data": {
                "id": "sub_123",
                "status": "active",
                "customer_id": "cus_456",
                "checkout_id": "co_789",
                "metadata": {}
            }
        }"#;

        let event: PolarWebhookEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.event_type, "subscription.active");

        let sub: PolarSubscription = serde_json::from_value(event.data).unwrap();
        assert_eq!(sub.id, "sub_123");
        assert_eq!(sub.customer_id.as_deref(), Some("cus_456"));
        assert_eq!(sub.checkout_id.as_deref(), Some("co_789"));
    }

    #[test]
    fn parse_subscription_without_checkout_reference() {
        let json = r#"{"id": "sub_1", "status": "revoked"}"#;
        let sub: PolarSubscription = serde_json::from_str(json).unwrap();
        assert!(sub.checkout_id.is_none());
        assert!(sub.customer_id.is_none());
    }

    #[test]
    fn parse_checkout_session_object() {
        let json = r#"{
            "id": "co_123",
            "url": "https://polar.sh/checkout/co_123",
            "status": "succeeded",
            "customer_id": "cus_456",
            "metadata": {"userId": "user_789"}
        }"#;

        let session: PolarCheckoutSession = serde_json::from_str(json).unwrap();
        assert_eq!(session.id, "co_123");
        assert_eq!(session.metadata.get("userId").unwrap(), "user_789");
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Price Convention Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn price_new_convention() {
        let json = r#"{"price_amount": 1999, "price_currency": "usd"}"#;
        let price: PolarPrice = serde_json::from_str(json).unwrap();
        assert_eq!(price.amount_minor(), Some(1999));
        assert_eq!(price.currency_code(), Some("usd"));
    }

    #[test]
    fn price_old_convention() {
        let json = r#"{"amount": 2999, "currency": "eur"}"#;
        let price: PolarPrice = serde_json::from_str(json).unwrap();
        assert_eq!(price.amount_minor(), Some(2999));
        assert_eq!(price.currency_code(), Some("eur"));
    }

    #[test]
    fn price_new_convention_wins_when_both_present() {
        let json = r#"{"price_amount": 1000, "amount": 2000, "price_currency": "usd", "currency": "eur"}"#;
        let price: PolarPrice = serde_json::from_str(json).unwrap();
        assert_eq!(price.amount_minor(), Some(1000));
        assert_eq!(price.currency_code(), Some("usd"));
    }

    #[test]
    fn price_with_neither_convention_parses() {
        let json = r#"{"amount_type": "free"}"#;
        let price: PolarPrice = serde_json::from_str(json).unwrap();
        assert_eq!(price.amount_minor(), None);
        assert_eq!(price.currency_code(), None);
    }

    #[test]
    fn product_defaults_for_missing_collections() {
        let json = r#"{"id": "prod_1", "name": "Pro Plan"}"#;
        let product: PolarProduct = serde_json::from_str(json).unwrap();
        assert!(product.prices.is_empty());
        assert!(product.benefits.is_empty());
        assert!(!product.is_archived);
    }
}
