//! Billing command handlers - webhook processing, checkout, portal.

mod create_checkout;
mod create_portal;
mod process_webhook;

pub use create_checkout::{
    success_redirect_url, CheckoutCreated, CreateCheckoutCommand, CreateCheckoutHandler,
};
pub use create_portal::{
    CreatePortalSessionCommand, CreatePortalSessionHandler, PortalSessionError,
};
pub use process_webhook::{
    ProcessWebhookCommand, ProcessWebhookHandler, ProcessWebhookResult, CHECKOUT_USER_KEY,
};
