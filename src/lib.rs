//! Billing Relay - Polar/Clerk subscription bridge
//!
//! This crate relays subscription lifecycle webhooks from the payments
//! provider (Polar) into per-user metadata at the identity provider (Clerk),
//! and creates checkout/portal sessions tagged with the caller's identity.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
