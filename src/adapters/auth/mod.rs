//! Authentication adapters - identity provider integrations.
//!
//! - [`ClerkSessionValidator`] validates session JWTs against Clerk's JWKS
//! - [`ClerkIdentityStore`] reads/writes per-user metadata via the Backend API
//! - [`MockSessionValidator`] / [`MockIdentityStore`] are test doubles

mod clerk;
mod clerk_store;
mod mock;

pub use clerk::{ClerkConfig, ClerkSessionValidator};
pub use clerk_store::ClerkIdentityStore;
pub use mock::{MockIdentityStore, MockSessionValidator};
