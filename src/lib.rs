//! belvo_bridge Library
//!
//! Bank account aggregation backend on top of the Belvo open-banking API:
//! users with JWT sessions, sandbox link creation, and account data
//! normalized across institutions.
//!
//! Re-exports modules for the binary and for integration testing.

use axum::{middleware, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod auth;
pub mod belvo;
pub mod config;
pub mod db;
pub mod domain;
mod error;
pub mod handlers;
pub mod jobs;
pub mod state;
pub mod store;

pub use config::Config;
pub use domain::{DomainError, OperationContext};
pub use error::{AppError, AppResult, ErrorResponse};
pub use state::AppState;

/// Initialize tracing/logging. `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "belvo_bridge=debug,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let api_router = api::create_router(state.clone());

    // Order: context -> logging -> auth (protected routes only) -> handler
    let api_routes = api_router.layer(
        ServiceBuilder::new()
            .layer(middleware::from_fn(api::middleware::context_middleware))
            .layer(middleware::from_fn(api::middleware::logging_middleware)),
    );

    Router::new()
        // Health check (no auth)
        .route("/health", axum::routing::get(health_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
