//! Axum router configuration for the relay endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    create_checkout, create_portal_session, handle_webhook, health, list_products, test_auth,
    BillingAppState,
};

/// Create the relay router.
///
/// # Routes
///
/// ## Webhook (no auth, signature verified)
/// - `POST /webhook` - receive subscription lifecycle events
///
/// ## Authenticated endpoints (bearer token)
/// - `GET /test-auth` - return caller identity
/// - `POST /create-checkout` - create checkout session
/// - `GET /api/create-portal-session` - get customer portal URL
///
/// ## Public endpoints
/// - `GET /api/products` - list purchasable products
/// - `GET /health` - liveness probe
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .route("/webhook", post(handle_webhook))
        .route("/test-auth", get(test_auth))
        .route("/create-checkout", post(create_checkout))
        .route("/api/create-portal-session", get(create_portal_session))
        .route("/api/products", get(list_products))
        .route("/health", get(health))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::adapters::auth::MockIdentityStore;
    use crate::adapters::polar::MockPaymentProvider;

    fn test_state() -> BillingAppState {
        BillingAppState {
            payment_provider: Arc::new(MockPaymentProvider::new()),
            identity_store: Arc::new(MockIdentityStore::new()),
            checkout_success_url: "https://app.example.com/success?checkout_id={CHECKOUT_ID}"
                .to_string(),
        }
    }

    #[test]
    fn billing_router_creates_router() {
        let router = billing_router();
        // Just verify it creates without panic
        let _: Router<()> = router.with_state(test_state());
    }
}
