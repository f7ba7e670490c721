//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST routes for the invoice lifecycle
//! - Authentication middleware resolving the acting user
//! - Error mapping to JSON responses
//! - Payment reminder dispatch

pub mod error;
pub mod middleware;
pub mod reminder;
pub mod routes;

use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use factura_shared::JwtService;
use factura_store::InvoiceCommands;

use crate::reminder::ReminderDispatcher;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Invoice unit of work over the configured repository.
    pub commands: InvoiceCommands,
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
    /// Where payment reminders go.
    pub reminders: Arc<dyn ReminderDispatcher>,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
