//! Enfor API - REST server for the brokerage backend
//!
//! Hosts the token service, the authentication core and the authorization
//! gate, and exposes the ownership-gated client, property and appointment
//! services over HTTP.

pub mod audit;
pub mod auth;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod response;
pub mod routes;
pub mod state;
pub mod uploads;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::handlers::health;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    let service_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics));

    Router::new()
        .merge(service_routes)
        .merge(openapi::router())
        .merge(routes::api_routes(state.clone()))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::metrics_middleware,
        ))
        .layer(from_fn(middleware::security_headers_middleware))
        .layer(cors_layer(&state.config.server.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Router over an in-memory store, for tests
pub fn create_router_for_testing() -> Router {
    create_router(Arc::new(AppState::for_testing()))
}

/// Any origin when none are configured, otherwise exactly the configured ones.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
