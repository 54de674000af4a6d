//! Mock payment provider for testing.
//!
//! A scriptable `PaymentProvider` double: webhook verification outcomes,
//! checkout sessions, and the product catalog are all configurable, and
//! every call is recorded so tests can assert the provider was (or was
//! not) reached.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::ports::{
    CheckoutSession, CreateCheckoutRequest, PaymentError, PaymentProvider, PortalSession, Product,
    WebhookEvent, WebhookHeaders,
};

/// Scriptable mock implementation of `PaymentProvider`.
#[derive(Default)]
pub struct MockPaymentProvider {
    /// Event returned by `verify_webhook` when verification is scripted
    /// to succeed.
    webhook_event: Mutex<Option<WebhookEvent>>,

    /// When true, `verify_webhook` fails with an invalid-signature error.
    fail_verify: Mutex<bool>,

    /// Checkout sessions resolvable by `get_checkout_session`.
    checkout_sessions: Mutex<HashMap<String, CheckoutSession>>,

    /// Session returned by `create_checkout_session`; when unset, the
    /// request's metadata is echoed back on a generated session.
    created_session: Mutex<Option<CheckoutSession>>,

    /// Products returned by `list_products`.
    products: Mutex<Vec<Product>>,

    /// Error returned by `create_checkout_session`, if scripted.
    checkout_error: Mutex<Option<PaymentError>>,

    /// Recorded `create_checkout_session` requests.
    recorded_checkouts: Mutex<Vec<CreateCheckoutRequest>>,

    /// Recorded `create_portal_session` customer ids.
    recorded_portals: Mutex<Vec<String>>,
}

impl MockPaymentProvider {
    /// Creates a new empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts `verify_webhook` to succeed with the given event.
    pub fn with_webhook_event(self, event: WebhookEvent) -> Self {
        *self.webhook_event.lock().unwrap() = Some(event);
        self
    }

    /// Scripts `verify_webhook` to fail with an invalid-signature error.
    pub fn with_failing_verification(self) -> Self {
        *self.fail_verify.lock().unwrap() = true;
        self
    }

    /// Makes a checkout session resolvable by id.
    pub fn with_checkout_session(self, session: CheckoutSession) -> Self {
        self.checkout_sessions
            .lock()
            .unwrap()
            .insert(session.id.clone(), session);
        self
    }

    /// Scripts the session returned by `create_checkout_session`.
    pub fn with_created_session(self, session: CheckoutSession) -> Self {
        *self.created_session.lock().unwrap() = Some(session);
        self
    }

    /// Scripts `create_checkout_session` to fail.
    pub fn with_checkout_error(self, error: PaymentError) -> Self {
        *self.checkout_error.lock().unwrap() = Some(error);
        self
    }

    /// Sets the product catalog.
    pub fn with_products(self, products: Vec<Product>) -> Self {
        *self.products.lock().unwrap() = products;
        self
    }

    /// Requests recorded by `create_checkout_session`.
    pub fn recorded_checkouts(&self) -> Vec<CreateCheckoutRequest> {
        self.recorded_checkouts.lock().unwrap().clone()
    }

    /// Customer ids recorded by `create_portal_session`.
    pub fn recorded_portals(&self) -> Vec<String> {
        self.recorded_portals.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        self.recorded_checkouts.lock().unwrap().push(request.clone());

        if let Some(error) = self.checkout_error.lock().unwrap().clone() {
            return Err(error);
        }

        if let Some(session) = self.created_session.lock().unwrap().clone() {
            return Ok(session);
        }

        // Default: echo the request metadata, as the real provider does
        Ok(CheckoutSession {
            id: "co_mock".to_string(),
            url: "https://polar.sh/checkout/co_mock".to_string(),
            customer_id: None,
            metadata: request.metadata,
        })
    }

    async fn get_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, PaymentError> {
        self.checkout_sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or_else(|| PaymentError::api(Some(404), format!("checkout {} not found", session_id)))
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
    ) -> Result<PortalSession, PaymentError> {
        self.recorded_portals
            .lock()
            .unwrap()
            .push(customer_id.to_string());

        Ok(PortalSession {
            id: "ps_mock".to_string(),
            url: format!("https://polar.sh/portal/{}", customer_id),
        })
    }

    async fn list_products(&self) -> Result<Vec<Product>, PaymentError> {
        Ok(self.products.lock().unwrap().clone())
    }

    async fn verify_webhook(
        &self,
        _payload: &[u8],
        _headers: &WebhookHeaders,
    ) -> Result<WebhookEvent, PaymentError> {
        if *self.fail_verify.lock().unwrap() {
            return Err(PaymentError::invalid_webhook("Invalid signature"));
        }

        self.webhook_event
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| PaymentError::invalid_webhook("No event scripted"))
    }
}
