//! API module
//!
//! HTTP API endpoints, extractors and middleware.

pub mod extract;
pub mod middleware;
pub mod routes;

pub use routes::create_router;
