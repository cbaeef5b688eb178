//! Request counting middleware
//!
//! Bumps the shared request counter behind `/metrics` and emits one debug
//! event per request with the normalised endpoint, status and latency.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::state::AppState;

pub async fn metrics_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let endpoint = normalize_endpoint(request.uri().path());

    state.increment_requests();
    let response = next.run(request).await;

    debug!(
        %method,
        endpoint = %endpoint,
        status = response.status().as_u16(),
        latency_us = start.elapsed().as_micros() as u64,
        "Request completed"
    );

    response
}

/// Replace id segments so requests for different records group together.
fn normalize_endpoint(path: &str) -> String {
    path.split('/')
        .map(|seg| if is_uuid(seg) { ":id" } else { seg })
        .collect::<Vec<_>>()
        .join("/")
}

fn is_uuid(s: &str) -> bool {
    s.len() == 36
        && s.chars().enumerate().all(|(i, c)| match i {
            8 | 13 | 18 | 23 => c == '-',
            _ => c.is_ascii_hexdigit(),
        })
}
