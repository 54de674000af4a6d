//! CreatePortalSessionHandler - Query handler for customer portal URLs.

use std::sync::Arc;
use thiserror::Error;

use crate::domain::billing;
use crate::domain::foundation::UserId;
use crate::ports::{IdentityError, IdentityStore, PaymentError, PaymentProvider, PortalSession};

/// Command to create a customer portal session for the caller.
#[derive(Debug, Clone)]
pub struct CreatePortalSessionCommand {
    /// The verified caller identity.
    pub user_id: UserId,
}

/// Errors from portal session creation.
#[derive(Debug, Error)]
pub enum PortalSessionError {
    /// The caller has no stored customer id (no subscription on file).
    #[error("no customer on file for user")]
    NoCustomer,

    /// Reading the caller's metadata failed.
    #[error(transparent)]
    Identity(IdentityError),

    /// The payment provider rejected or failed the request.
    #[error(transparent)]
    Payment(#[from] PaymentError),
}

/// Handler for creating customer portal sessions.
///
/// Looks up the caller's stored customer id and asks the payment provider
/// for a portal session keyed by it.
pub struct CreatePortalSessionHandler {
    payment_provider: Arc<dyn PaymentProvider>,
    identity_store: Arc<dyn IdentityStore>,
}

impl CreatePortalSessionHandler {
    pub fn new(
        payment_provider: Arc<dyn PaymentProvider>,
        identity_store: Arc<dyn IdentityStore>,
    ) -> Self {
        Self {
            payment_provider,
            identity_store,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreatePortalSessionCommand,
    ) -> Result<PortalSession, PortalSessionError> {
        let metadata = match self.identity_store.get_metadata(&cmd.user_id).await {
            Ok(metadata) => metadata,
            // An unknown user has no subscription on file either way
            Err(IdentityError::UserNotFound) => return Err(PortalSessionError::NoCustomer),
            Err(e) => return Err(PortalSessionError::Identity(e)),
        };

        let Some(customer_id) = billing::customer_id(&metadata) else {
            tracing::debug!(user_id = %cmd.user_id, "No customer id on file");
            return Err(PortalSessionError::NoCustomer);
        };

        let session = self.payment_provider.create_portal_session(customer_id).await?;

        tracing::info!(user_id = %cmd.user_id, session_id = %session.id, "Portal session created");

        Ok(session)
    }
}
