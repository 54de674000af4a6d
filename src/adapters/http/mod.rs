//! HTTP adapters - REST API implementation.

pub mod billing;
pub mod middleware;

// Re-export key types for convenience
pub use billing::{billing_router, BillingAppState};

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use middleware::{auth_middleware, AuthState};

/// Assemble the full application router: routes, auth middleware,
/// request tracing, and CORS.
///
/// With no configured origins (development), CORS is permissive;
/// otherwise only the listed origins are allowed.
pub fn app_router(
    state: BillingAppState,
    validator: AuthState,
    cors_origins: &[String],
) -> Router {
    let cors = if cors_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
    };

    billing_router()
        .with_state(state)
        .layer(axum::middleware::from_fn_with_state(
            validator,
            auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
