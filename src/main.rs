//! Billing relay entry point.
//!
//! Startup sequence: load `.env`, load and validate configuration,
//! initialize tracing, construct the singleton provider clients, build
//! the router, and serve.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use billing_relay::adapters::auth::{ClerkConfig, ClerkIdentityStore, ClerkSessionValidator};
use billing_relay::adapters::http::{app_router, BillingAppState};
use billing_relay::adapters::polar::{PolarConfig, PolarEnvironment, PolarPaymentAdapter};
use billing_relay::application::handlers::billing::success_redirect_url;
use billing_relay::config::AppConfig;
use billing_relay::ports::{IdentityStore, PaymentProvider, SessionValidator};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.server.log_level))
        .init();

    // Identity provider clients (process-wide singletons)
    let mut clerk_config = ClerkConfig::new(&config.auth.clerk_issuer)
        .with_cache_duration(config.auth.jwks_cache_ttl());
    if let Some(party) = &config.auth.authorized_party {
        clerk_config = clerk_config.with_authorized_party(party);
    }
    let validator: Arc<dyn SessionValidator> = Arc::new(ClerkSessionValidator::new(clerk_config));
    let identity_store: Arc<dyn IdentityStore> =
        Arc::new(ClerkIdentityStore::new(&config.auth.clerk_secret_key));

    // Payment provider client
    let polar_environment = if config.payment.is_sandbox() {
        PolarEnvironment::Sandbox
    } else {
        PolarEnvironment::Production
    };
    let polar_config = PolarConfig::new(
        &config.payment.polar_access_token,
        &config.payment.polar_webhook_secret,
    )
    .with_environment(polar_environment);
    let payment_provider: Arc<dyn PaymentProvider> =
        Arc::new(PolarPaymentAdapter::new(polar_config));

    let state = BillingAppState {
        payment_provider,
        identity_store,
        checkout_success_url: success_redirect_url(&config.server.frontend_base_url),
    };

    let app = app_router(state, validator, &config.server.cors_origins_list());

    let addr = config.server.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "billing-relay listening");

    axum::serve(listener, app).await?;

    Ok(())
}
