//! Health check endpoint.
//!
//! Reports liveness along with the path prefixes this instance captures, so a
//! deployment can be checked for the instrumentation it was started with.

use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "healthy" if reachable.
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
    /// Crate version.
    pub version: &'static str,
    /// Path prefixes whose requests are recorded.
    pub capture_prefixes: Vec<String>,
}

/// Creates the health check routes.
pub fn health_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "routepulse-api",
        version: env!("CARGO_PKG_VERSION"),
        capture_prefixes: state.capture_scope().prefixes().to_vec(),
    })
}
