//! Application layer - orchestrates ports to fulfill operations.

pub mod handlers;
