//! Adapters - provider integrations and the HTTP surface.

pub mod auth;
pub mod http;
pub mod polar;
