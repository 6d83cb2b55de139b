//! Belvo integration
//!
//! HTTP client for the Belvo open-banking API, the sandbox credentials used to
//! create test links, and the normalizer that reshapes upstream payloads.

pub mod client;
pub mod normalize;
pub mod sandbox;

pub use client::BelvoClient;
pub use sandbox::{SandboxCredential, SANDBOX_CREDENTIALS};

/// Belvo client errors
#[derive(Debug, thiserror::Error)]
pub enum BelvoError {
    /// Non-2xx response
    #[error("Belvo returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Connection failure, timeout, or unreadable body
    #[error("Request to Belvo failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid Belvo URL: {0}")]
    InvalidUrl(String),

    #[error("Unexpected Belvo response: {0}")]
    UnexpectedResponse(String),
}
