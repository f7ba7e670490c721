//! Liveness endpoint.

use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::AppState;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
    /// Service version.
    pub version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "factura",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Creates health check routes. No authentication.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
