//! HTTP application wiring.
//!
//! - `services.rs`: picks the book store and builds the back office
//! - `routes/`: handlers, one file per area
//! - `dto.rs`: request bodies and JSON mapping
//! - `errors.rs`: error envelopes

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use backoffice_auth::Hs256JwtValidator;
use backoffice_infra::AppConfig;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router from configuration.
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let services = Arc::new(services::build_services(config).await?);
    Ok(router_with_services(services, config))
}

/// Router over already-built services.
pub fn router_with_services(services: Arc<services::AppServices>, config: &AppConfig) -> Router {
    let jwt = Arc::new(Hs256JwtValidator::new(config.jwt_secret.as_bytes()));
    let auth_state = middleware::AuthState { jwt };

    // Everything except health requires an admin bearer token.
    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn(middleware::log_requests)))
}
