//! HTTP handlers for the relay endpoints.
//!
//! These handlers connect axum routes to application layer command/query
//! handlers and own the error-to-status mapping.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

use crate::application::handlers::billing::{
    CreateCheckoutCommand, CreateCheckoutHandler, CreatePortalSessionCommand,
    CreatePortalSessionHandler, PortalSessionError, ProcessWebhookCommand, ProcessWebhookHandler,
};
use crate::application::handlers::catalog::ListProductsHandler;
use crate::ports::{IdentityError, IdentityStore, PaymentError, PaymentProvider, WebhookHeaders};

use super::super::middleware::RequireAuth;
use super::dto::{
    AuthProbeResponse, CheckoutResponse, ErrorResponse, PortalResponse, ProductResponse,
    WebhookAckResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// This struct is cloned for each request and contains Arc-wrapped
/// dependencies for efficient sharing across handlers.
#[derive(Clone)]
pub struct BillingAppState {
    pub payment_provider: Arc<dyn PaymentProvider>,
    pub identity_store: Arc<dyn IdentityStore>,
    /// Fully-templated success redirect URL for checkout sessions.
    pub checkout_success_url: String,
}

impl BillingAppState {
    /// Create handlers on demand from the shared state.
    pub fn webhook_handler(&self) -> ProcessWebhookHandler {
        ProcessWebhookHandler::new(self.payment_provider.clone(), self.identity_store.clone())
    }

    pub fn create_checkout_handler(&self) -> CreateCheckoutHandler {
        CreateCheckoutHandler::new(
            self.payment_provider.clone(),
            self.checkout_success_url.clone(),
        )
    }

    pub fn portal_handler(&self) -> CreatePortalSessionHandler {
        CreatePortalSessionHandler::new(self.payment_provider.clone(), self.identity_store.clone())
    }

    pub fn list_products_handler(&self) -> ListProductsHandler {
        ListProductsHandler::new(self.payment_provider.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhook - Receive payment provider webhook deliveries
///
/// Signature verification failures respond 403 with no side effect.
/// Once verified, the delivery is always acknowledged with 202 - update
/// failures are logged, never surfaced to the provider.
pub async fn handle_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let webhook_headers = extract_webhook_headers(&headers)?;

    let handler = state.webhook_handler();
    let cmd = ProcessWebhookCommand {
        payload: body.to_vec(),
        headers: webhook_headers,
    };

    // The handler only errors on verification failure
    let outcome = handler.handle(cmd).await?;
    tracing::debug!(?outcome, "Webhook delivery processed");

    Ok((StatusCode::ACCEPTED, Json(WebhookAckResponse { received: true })))
}

/// Pull the signature-bearing headers off the request.
///
/// A delivery without complete signature material cannot be verified, so
/// it gets the same forbidden response as a bad signature.
fn extract_webhook_headers(headers: &HeaderMap) -> Result<WebhookHeaders, ApiError> {
    let get = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| ApiError::Forbidden(format!("Missing {} header", name)))
    };

    Ok(WebhookHeaders {
        id: get("webhook-id")?,
        timestamp: get("webhook-timestamp")?,
        signature: get("webhook-signature")?,
    })
}

/// POST /create-checkout - Create a checkout session for the caller
pub async fn create_checkout(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    body: Option<Json<serde_json::Value>>,
) -> Result<impl IntoResponse, ApiError> {
    // A missing, non-object, or empty body never reaches the provider
    let options = body
        .and_then(|Json(value)| match value {
            serde_json::Value::Object(map) if !map.is_empty() => Some(map),
            _ => None,
        })
        .ok_or_else(|| {
            ApiError::BadRequest("Request body must be a non-empty JSON object".to_string())
        })?;

    let handler = state.create_checkout_handler();
    let cmd = CreateCheckoutCommand {
        user_id: user.id,
        options,
    };

    let result = handler.handle(cmd).await?;

    // An echo mismatch downgrades the status and attaches a warning
    let status = if result.identity_echoed {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let response = CheckoutResponse::from_session(result.session, result.identity_echoed);

    Ok((status, Json(response)))
}

/// GET /api/create-portal-session - Get a customer portal URL for the caller
pub async fn create_portal_session(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let handler = state.portal_handler();
    let session = handler
        .handle(CreatePortalSessionCommand { user_id: user.id })
        .await?;

    Ok(Json(PortalResponse::from(session)))
}

/// GET /api/products - List purchasable products (no authentication)
pub async fn list_products(
    State(state): State<BillingAppState>,
) -> Result<impl IntoResponse, ApiError> {
    let handler = state.list_products_handler();
    let summaries = handler.handle().await?;

    let products: Vec<ProductResponse> = summaries.into_iter().map(ProductResponse::from).collect();
    Ok(Json(products))
}

/// GET /test-auth - Return the caller's identity (diagnostic)
pub async fn test_auth(RequireAuth(user): RequireAuth) -> impl IntoResponse {
    Json(AuthProbeResponse::from(&user))
}

/// GET /health - Liveness probe
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type mapping failures onto the HTTP taxonomy:
/// 400 bad body, 403 failed webhook verification, 404 missing resource,
/// 422 provider validation, 500 everything else upstream.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Forbidden(String),
    NotFound(String),
    UnprocessableEntity {
        message: String,
        details: Option<serde_json::Value>,
    },
    Internal(String),
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Validation { message, details } => {
                ApiError::UnprocessableEntity { message, details }
            }
            PaymentError::InvalidWebhook(message) => ApiError::Forbidden(message),
            PaymentError::Api { .. } | PaymentError::Network(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::UserNotFound => ApiError::NotFound("User not found".to_string()),
            IdentityError::Api { .. } | IdentityError::Network(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<PortalSessionError> for ApiError {
    fn from(err: PortalSessionError) -> Self {
        match err {
            PortalSessionError::NoCustomer => {
                ApiError::NotFound("No subscription on file".to_string())
            }
            PortalSessionError::Identity(e) => e.into(),
            PortalSessionError::Payment(e) => e.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("BAD_REQUEST", message),
            ),
            ApiError::Forbidden(message) => {
                tracing::warn!(error = %message, "Webhook verification failed");
                (
                    StatusCode::FORBIDDEN,
                    ErrorResponse::new("WEBHOOK_VERIFICATION_FAILED", message),
                )
            }
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new("NOT_FOUND", message),
            ),
            ApiError::UnprocessableEntity { message, details } => {
                let mut body = ErrorResponse::new("VALIDATION_FAILED", message);
                if let Some(details) = details {
                    body = body.with_details(details);
                }
                (StatusCode::UNPROCESSABLE_ENTITY, body)
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Upstream provider failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("UPSTREAM_ERROR", "Upstream provider failure"),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
