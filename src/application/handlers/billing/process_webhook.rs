//! ProcessWebhookHandler - Command handler for payment provider webhooks.
//!
//! Verification failures are the only errors this handler propagates.
//! Everything after a verified signature is best-effort: resolution or
//! update failures are logged and swallowed so the provider sees the
//! delivery as accepted and does not retry.

use std::sync::Arc;

use crate::domain::billing::BillingMetadata;
use crate::domain::foundation::UserId;
use crate::ports::{
    IdentityStore, PaymentError, PaymentProvider, WebhookEvent, WebhookEventData,
    WebhookEventType, WebhookHeaders,
};

/// Metadata key linking a checkout session to a user identity.
pub const CHECKOUT_USER_KEY: &str = "userId";

/// Command to process a payment webhook delivery.
#[derive(Debug, Clone)]
pub struct ProcessWebhookCommand {
    /// Raw webhook payload.
    pub payload: Vec<u8>,
    /// Signature-bearing headers.
    pub headers: WebhookHeaders,
}

/// Result of webhook processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessWebhookResult {
    /// Subscription activated, user metadata overwritten.
    MetadataActivated { user_id: String },
    /// Subscription revoked, user metadata merged.
    MetadataRevoked { user_id: String },
    /// Checkout resolved but carried no linked identity.
    MissingIdentity,
    /// Event carried no checkout reference to resolve.
    MissingCheckoutReference,
    /// Resolution or metadata update failed; swallowed by design.
    UpdateFailed,
    /// Event acknowledged but no action taken.
    Acknowledged,
    /// Event ignored (unknown type).
    Ignored,
}

/// Handler for payment provider webhooks.
///
/// Verifies the delivery, then applies the subscription state to the
/// identity provider's metadata for the linked user.
pub struct ProcessWebhookHandler {
    payment_provider: Arc<dyn PaymentProvider>,
    identity_store: Arc<dyn IdentityStore>,
}

impl ProcessWebhookHandler {
    pub fn new(
        payment_provider: Arc<dyn PaymentProvider>,
        identity_store: Arc<dyn IdentityStore>,
    ) -> Self {
        Self {
            payment_provider,
            identity_store,
        }
    }

    /// Process a webhook delivery.
    ///
    /// Returns `Err` only when signature verification fails; every
    /// post-verification outcome is an `Ok` variant.
    pub async fn handle(
        &self,
        cmd: ProcessWebhookCommand,
    ) -> Result<ProcessWebhookResult, PaymentError> {
        // 1. Verify signature and parse the event
        let event = self
            .payment_provider
            .verify_webhook(&cmd.payload, &cmd.headers)
            .await?;

        // 2. Dispatch on the typed event
        let result = match event.event_type {
            WebhookEventType::SubscriptionActive => self.apply_activation(&event).await,
            WebhookEventType::SubscriptionRevoked => self.apply_revocation(&event).await,
            WebhookEventType::SubscriptionCanceled => {
                // Cancellation keeps access until period end; revocation
                // is the event that withdraws it.
                tracing::debug!(delivery_id = %event.id, "Subscription canceled, no action");
                ProcessWebhookResult::Acknowledged
            }
            WebhookEventType::Unknown(ref event_type) => {
                tracing::debug!(delivery_id = %event.id, event_type, "Ignoring event");
                ProcessWebhookResult::Ignored
            }
        };

        Ok(result)
    }

    /// Resolve the event's checkout reference to the linked user identity.
    ///
    /// Returns `Err` with the terminal result when resolution cannot
    /// proceed; all such outcomes are logged, not propagated.
    async fn resolve_identity(
        &self,
        event: &WebhookEvent,
        checkout_id: &Option<String>,
    ) -> Result<UserId, ProcessWebhookResult> {
        let Some(checkout_id) = checkout_id else {
            tracing::warn!(
                delivery_id = %event.id,
                "Subscription event has no checkout reference, skipping"
            );
            return Err(ProcessWebhookResult::MissingCheckoutReference);
        };

        let session = match self.payment_provider.get_checkout_session(checkout_id).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(
                    delivery_id = %event.id,
                    checkout_id,
                    error = %e,
                    "Failed to resolve checkout session"
                );
                return Err(ProcessWebhookResult::UpdateFailed);
            }
        };

        let Some(user_id) = session
            .metadata
            .get(CHECKOUT_USER_KEY)
            .and_then(|s| UserId::new(s.as_str()).ok())
        else {
            tracing::warn!(
                delivery_id = %event.id,
                checkout_id,
                "Checkout session carries no linked user identity, skipping"
            );
            return Err(ProcessWebhookResult::MissingIdentity);
        };

        Ok(user_id)
    }

    async fn apply_activation(&self, event: &WebhookEvent) -> ProcessWebhookResult {
        let WebhookEventData::Subscription {
            subscription_id,
            customer_id,
            checkout_id,
            ..
        } = &event.data
        else {
            tracing::warn!(delivery_id = %event.id, "Unexpected data shape for activation");
            return ProcessWebhookResult::UpdateFailed;
        };

        let user_id = match self.resolve_identity(event, checkout_id).await {
            Ok(user_id) => user_id,
            Err(result) => return result,
        };

        // Overwrite the stored object wholesale with the billing fields
        let metadata = BillingMetadata::activated(subscription_id, customer_id).into_map();

        match self.identity_store.set_metadata(&user_id, metadata).await {
            Ok(()) => {
                tracing::info!(
                    delivery_id = %event.id,
                    user_id = %user_id,
                    subscription_id,
                    "Subscription activated, metadata updated"
                );
                ProcessWebhookResult::MetadataActivated {
                    user_id: user_id.to_string(),
                }
            }
            Err(e) => {
                tracing::error!(
                    delivery_id = %event.id,
                    user_id = %user_id,
                    error = %e,
                    "Metadata update failed after activation"
                );
                ProcessWebhookResult::UpdateFailed
            }
        }
    }

    async fn apply_revocation(&self, event: &WebhookEvent) -> ProcessWebhookResult {
        let WebhookEventData::Subscription {
            subscription_id,
            customer_id,
            checkout_id,
            ..
        } = &event.data
        else {
            tracing::warn!(delivery_id = %event.id, "Unexpected data shape for revocation");
            return ProcessWebhookResult::UpdateFailed;
        };

        let user_id = match self.resolve_identity(event, checkout_id).await {
            Ok(user_id) => user_id,
            Err(result) => return result,
        };

        // Read-modify-write; not atomic with respect to concurrent
        // deliveries for the same user.
        let existing = match self.identity_store.get_metadata(&user_id).await {
            Ok(existing) => existing,
            Err(e) => {
                tracing::error!(
                    delivery_id = %event.id,
                    user_id = %user_id,
                    error = %e,
                    "Failed to read metadata before revocation"
                );
                return ProcessWebhookResult::UpdateFailed;
            }
        };

        let metadata =
            BillingMetadata::revoked(&existing, subscription_id, customer_id).merge_into(existing);

        match self.identity_store.set_metadata(&user_id, metadata).await {
            Ok(()) => {
                tracing::info!(
                    delivery_id = %event.id,
                    user_id = %user_id,
                    subscription_id,
                    "Subscription revoked, metadata updated"
                );
                ProcessWebhookResult::MetadataRevoked {
                    user_id: user_id.to_string(),
                }
            }
            Err(e) => {
                tracing::error!(
                    delivery_id = %event.id,
                    user_id = %user_id,
                    error = %e,
                    "Metadata update failed after revocation"
                );
                ProcessWebhookResult::UpdateFailed
            }
        }
    }
}
