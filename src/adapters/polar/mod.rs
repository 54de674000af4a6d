//! Polar adapter - payment provider integration.
//!
//! - [`PolarPaymentAdapter`] is the production `PaymentProvider`
//! - [`MockPaymentProvider`] is the scriptable test double
//! - [`webhook_types`] holds wire structs and signature parsing

pub mod mock_payment_provider;
pub mod polar_adapter;
pub mod webhook_types;

pub use mock_payment_provider::MockPaymentProvider;
pub use polar_adapter::{PolarConfig, PolarEnvironment, PolarPaymentAdapter};
