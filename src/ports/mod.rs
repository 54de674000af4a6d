//! Port traits - the seams between the application and external providers.

mod identity_store;
mod payment_provider;
mod session_validator;

pub use identity_store::{IdentityError, IdentityStore};
pub use payment_provider::{
    Benefit, CheckoutSession, CreateCheckoutRequest, PaymentError, PaymentProvider, PortalSession,
    Product, ProductPrice, WebhookEvent, WebhookEventData, WebhookEventType, WebhookHeaders,
};
pub use session_validator::SessionValidator;
