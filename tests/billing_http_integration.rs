//! Integration tests for the relay HTTP surface.
//!
//! These tests drive the assembled router with mock ports and verify the
//! external contract: status codes, side effects on identity metadata,
//! and that providers are only reached when they should be.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use billing_relay::adapters::auth::{MockIdentityStore, MockSessionValidator};
use billing_relay::adapters::http::{app_router, BillingAppState};
use billing_relay::adapters::polar::MockPaymentProvider;
use billing_relay::ports::{
    Benefit, CheckoutSession, Product, ProductPrice, SessionValidator, WebhookEvent,
    WebhookEventData, WebhookEventType,
};

// =============================================================================
// Test Infrastructure
// =============================================================================

const VALID_TOKEN: &str = "valid-session-token";
const TEST_USER: &str = "user_1";

fn build_app(
    payment: Arc<MockPaymentProvider>,
    store: Arc<MockIdentityStore>,
) -> axum::Router {
    let validator: Arc<dyn SessionValidator> =
        Arc::new(MockSessionValidator::new().with_test_user(VALID_TOKEN, TEST_USER));

    let state = BillingAppState {
        payment_provider: payment,
        identity_store: store,
        checkout_success_url: "https://app.example.com/success?checkout_id={CHECKOUT_ID}"
            .to_string(),
    };

    app_router(state, validator, &[])
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn subscription_event(
    event_type: WebhookEventType,
    subscription_id: &str,
    checkout_id: Option<&str>,
) -> WebhookEvent {
    WebhookEvent {
        id: "wh_1".to_string(),
        event_type,
        data: WebhookEventData::Subscription {
            subscription_id: subscription_id.to_string(),
            customer_id: "cus_1".to_string(),
            checkout_id: checkout_id.map(str::to_string),
            status: "active".to_string(),
        },
    }
}

fn linked_checkout(checkout_id: &str, user_id: &str) -> CheckoutSession {
    CheckoutSession {
        id: checkout_id.to_string(),
        url: format!("https://polar.sh/checkout/{}", checkout_id),
        customer_id: Some("cus_1".to_string()),
        metadata: HashMap::from([("userId".to_string(), user_id.to_string())]),
    }
}

fn webhook_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .header("webhook-id", "wh_1")
        .header("webhook-timestamp", "1704067200")
        .header("webhook-signature", "v1,c2lnbmF0dXJl")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn authed_post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Authorization", format!("Bearer {}", VALID_TOKEN))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn authed_get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("Authorization", format!("Bearer {}", VALID_TOKEN))
        .body(Body::empty())
        .unwrap()
}

// =============================================================================
// Auth Probe
// =============================================================================

#[tokio::test]
async fn test_auth_returns_identity_for_valid_token() {
    let app = build_app(
        Arc::new(MockPaymentProvider::new()),
        Arc::new(MockIdentityStore::new()),
    );

    let response = app.oneshot(authed_get("/test-auth")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user_id"], TEST_USER);
}

#[tokio::test]
async fn test_auth_without_token_is_unauthorized() {
    let app = build_app(
        Arc::new(MockPaymentProvider::new()),
        Arc::new(MockIdentityStore::new()),
    );

    let request = Request::builder()
        .method("GET")
        .uri("/test-auth")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_with_invalid_token_is_unauthorized() {
    let app = build_app(
        Arc::new(MockPaymentProvider::new()),
        Arc::new(MockIdentityStore::new()),
    );

    let request = Request::builder()
        .method("GET")
        .uri("/test-auth")
        .header("Authorization", "Bearer wrong-token")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Checkout Creation
// =============================================================================

#[tokio::test]
async fn create_checkout_without_token_never_reaches_provider() {
    let payment = Arc::new(MockPaymentProvider::new());
    let app = build_app(payment.clone(), Arc::new(MockIdentityStore::new()));

    let request = Request::builder()
        .method("POST")
        .uri("/create-checkout")
        .header("content-type", "application/json")
        .body(Body::from(json!({"products": ["prod_1"]}).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(payment.recorded_checkouts().is_empty());
}

#[tokio::test]
async fn create_checkout_with_empty_body_is_bad_request() {
    let payment = Arc::new(MockPaymentProvider::new());
    let app = build_app(payment.clone(), Arc::new(MockIdentityStore::new()));

    let response = app
        .oneshot(authed_post("/create-checkout", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(payment.recorded_checkouts().is_empty());
}

#[tokio::test]
async fn create_checkout_with_missing_body_is_bad_request() {
    let payment = Arc::new(MockPaymentProvider::new());
    let app = build_app(payment.clone(), Arc::new(MockIdentityStore::new()));

    let request = Request::builder()
        .method("POST")
        .uri("/create-checkout")
        .header("Authorization", format!("Bearer {}", VALID_TOKEN))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(payment.recorded_checkouts().is_empty());
}

#[tokio::test]
async fn create_checkout_injects_caller_identity_over_spoofed_value() {
    let payment = Arc::new(MockPaymentProvider::new());
    let app = build_app(payment.clone(), Arc::new(MockIdentityStore::new()));

    let response = app
        .oneshot(authed_post(
            "/create-checkout",
            json!({
                "products": ["prod_1"],
                "metadata": {"userId": "someone-else"}
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);

    let recorded = payment.recorded_checkouts();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].metadata.get("userId").unwrap(), TEST_USER);
    assert_eq!(
        recorded[0].success_url,
        "https://app.example.com/success?checkout_id={CHECKOUT_ID}"
    );

    let body = body_json(response).await;
    assert_eq!(body["id"], "co_mock");
    assert!(body.get("warning").is_none());
}

#[tokio::test]
async fn create_checkout_echo_mismatch_downgrades_to_ok_with_warning() {
    // Provider returns a session that dropped the metadata
    let session = CheckoutSession {
        id: "co_1".to_string(),
        url: "https://polar.sh/checkout/co_1".to_string(),
        customer_id: None,
        metadata: HashMap::new(),
    };
    let payment = Arc::new(MockPaymentProvider::new().with_created_session(session));
    let app = build_app(payment, Arc::new(MockIdentityStore::new()));

    let response = app
        .oneshot(authed_post(
            "/create-checkout",
            json!({"products": ["prod_1"]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["warning"].as_str().is_some());
}

#[tokio::test]
async fn create_checkout_maps_provider_validation_to_unprocessable_entity() {
    let payment = Arc::new(MockPaymentProvider::new().with_checkout_error(
        billing_relay::ports::PaymentError::validation(
            "products is required",
            Some(json!([{"loc": ["products"], "msg": "required"}])),
        ),
    ));
    let app = build_app(payment, Arc::new(MockIdentityStore::new()));

    let response = app
        .oneshot(authed_post("/create-checkout", json!({"bogus": true})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert_eq!(body["details"][0]["msg"], "required");
}

#[tokio::test]
async fn create_checkout_maps_other_provider_failures_to_server_error() {
    let payment = Arc::new(MockPaymentProvider::new().with_checkout_error(
        billing_relay::ports::PaymentError::network("connection reset"),
    ));
    let app = build_app(payment, Arc::new(MockIdentityStore::new()));

    let response = app
        .oneshot(authed_post(
            "/create-checkout",
            json!({"products": ["prod_1"]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// =============================================================================
// Webhook Processing
// =============================================================================

#[tokio::test]
async fn webhook_with_invalid_signature_is_forbidden_and_changes_nothing() {
    let payment = Arc::new(MockPaymentProvider::new().with_failing_verification());
    let store = Arc::new(MockIdentityStore::new().with_metadata(
        TEST_USER,
        json!({"plan": "pro"}).as_object().unwrap().clone(),
    ));
    let app = build_app(payment, store.clone());

    let response = app
        .oneshot(webhook_request(r#"{"type":"subscription.active"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(store.metadata_for(TEST_USER).unwrap()["plan"], "pro");
}

#[tokio::test]
async fn webhook_with_missing_signature_headers_is_forbidden() {
    let payment = Arc::new(MockPaymentProvider::new());
    let app = build_app(payment, Arc::new(MockIdentityStore::new()));

    let request = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn webhook_activation_overwrites_metadata_exactly() {
    let payment = Arc::new(
        MockPaymentProvider::new()
            .with_webhook_event(subscription_event(
                WebhookEventType::SubscriptionActive,
                "sub_1",
                Some("co_1"),
            ))
            .with_checkout_session(linked_checkout("co_1", TEST_USER)),
    );
    let store = Arc::new(MockIdentityStore::new().with_metadata(
        TEST_USER,
        json!({"stale": "value"}).as_object().unwrap().clone(),
    ));
    let app = build_app(payment, store.clone());

    let response = app.oneshot(webhook_request("{}")).await.unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let metadata = store.metadata_for(TEST_USER).unwrap();
    assert_eq!(metadata.len(), 4);
    assert_eq!(metadata["subscriptionId"], "sub_1");
    assert_eq!(metadata["customerId"], "cus_1");
    assert_eq!(metadata["plan"], "pro");
    assert_eq!(metadata["status"], "active");
}

#[tokio::test]
async fn webhook_revocation_preserves_prior_subscription_id() {
    let payment = Arc::new(
        MockPaymentProvider::new()
            .with_webhook_event(subscription_event(
                WebhookEventType::SubscriptionRevoked,
                "sub_2",
                Some("co_1"),
            ))
            .with_checkout_session(linked_checkout("co_1", TEST_USER)),
    );
    let store = Arc::new(MockIdentityStore::new().with_metadata(
        TEST_USER,
        json!({"subscriptionId": "sub_1", "customerId": "cus_old"})
            .as_object()
            .unwrap()
            .clone(),
    ));
    let app = build_app(payment, store.clone());

    let response = app.oneshot(webhook_request("{}")).await.unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let metadata = store.metadata_for(TEST_USER).unwrap();
    assert_eq!(metadata["subscriptionId"], "sub_1");
    assert_eq!(metadata["customerId"], "cus_1");
    assert_eq!(metadata["plan"], "free");
    assert_eq!(metadata["status"], "revoked");
}

#[tokio::test]
async fn webhook_update_failure_is_still_accepted() {
    let payment = Arc::new(
        MockPaymentProvider::new()
            .with_webhook_event(subscription_event(
                WebhookEventType::SubscriptionActive,
                "sub_1",
                Some("co_1"),
            ))
            .with_checkout_session(linked_checkout("co_1", TEST_USER)),
    );
    let store = Arc::new(
        MockIdentityStore::new()
            .with_user(TEST_USER)
            .with_failing_writes(billing_relay::ports::IdentityError::network("down")),
    );
    let app = build_app(payment, store);

    let response = app.oneshot(webhook_request("{}")).await.unwrap();

    // Best-effort by design: the provider still sees the delivery accepted
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn webhook_unknown_event_is_accepted_without_action() {
    let payment = Arc::new(MockPaymentProvider::new().with_webhook_event(WebhookEvent {
        id: "wh_9".to_string(),
        event_type: WebhookEventType::Unknown("order.created".to_string()),
        data: WebhookEventData::Raw {
            json: "{}".to_string(),
        },
    }));
    let store = Arc::new(MockIdentityStore::new().with_user(TEST_USER));
    let app = build_app(payment, store.clone());

    let response = app.oneshot(webhook_request("{}")).await.unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(store.metadata_for(TEST_USER).unwrap().is_empty());
}

// =============================================================================
// Portal Sessions
// =============================================================================

#[tokio::test]
async fn portal_session_requires_authentication() {
    let app = build_app(
        Arc::new(MockPaymentProvider::new()),
        Arc::new(MockIdentityStore::new()),
    );

    let request = Request::builder()
        .method("GET")
        .uri("/api/create-portal-session")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn portal_session_without_customer_is_not_found() {
    let payment = Arc::new(MockPaymentProvider::new());
    let store = Arc::new(MockIdentityStore::new().with_user(TEST_USER));
    let app = build_app(payment.clone(), store);

    let response = app
        .oneshot(authed_get("/api/create-portal-session"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(payment.recorded_portals().is_empty());
}

#[tokio::test]
async fn portal_session_returns_url_for_stored_customer() {
    let payment = Arc::new(MockPaymentProvider::new());
    let store = Arc::new(MockIdentityStore::new().with_metadata(
        TEST_USER,
        json!({"customerId": "cus_42"}).as_object().unwrap().clone(),
    ));
    let app = build_app(payment, store);

    let response = app
        .oneshot(authed_get("/api/create-portal-session"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["portal_url"], "https://polar.sh/portal/cus_42");
}

// =============================================================================
// Product Catalog
// =============================================================================

#[tokio::test]
async fn products_endpoint_requires_no_authentication() {
    let payment = Arc::new(MockPaymentProvider::new().with_products(vec![Product {
        id: "prod_1".to_string(),
        name: "Pro Plan".to_string(),
        description: Some("Everything unlocked".to_string()),
        is_recurring: true,
        is_archived: false,
        prices: vec![ProductPrice {
            amount_minor: Some(1999),
            currency: Some("usd".to_string()),
        }],
        benefits: vec![Benefit {
            description: "Unlimited projects".to_string(),
        }],
    }]));
    let app = build_app(payment, Arc::new(MockIdentityStore::new()));

    let request = Request::builder()
        .method("GET")
        .uri("/api/products")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body[0]["id"], "prod_1");
    assert_eq!(body[0]["price"], 19.99);
    assert_eq!(body[0]["popular"], true);
    assert_eq!(body[0]["features"][0], "Unlimited projects");
}

#[tokio::test]
async fn products_endpoint_defaults_missing_price_fields() {
    let payment = Arc::new(MockPaymentProvider::new().with_products(vec![Product {
        id: "prod_2".to_string(),
        name: "Starter".to_string(),
        description: None,
        is_recurring: true,
        is_archived: false,
        prices: vec![ProductPrice::default()],
        benefits: vec![],
    }]));
    let app = build_app(payment, Arc::new(MockIdentityStore::new()));

    let request = Request::builder()
        .method("GET")
        .uri("/api/products")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body[0]["price"], 0.0);
    assert_eq!(body[0]["currency"], "USD");
    assert_eq!(body[0]["popular"], false);
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn health_endpoint_responds_ok() {
    let app = build_app(
        Arc::new(MockPaymentProvider::new()),
        Arc::new(MockIdentityStore::new()),
    );

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
