//! Authentication module
//!
//! Password hashing and JWT issuance/validation.

pub mod jwt;
pub mod password;

pub use jwt::{Claims, JwtService, TokenPair, TokenType};
pub use password::{hash_password, verify_dummy_password, verify_password};

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Token has been revoked")]
    RevokedToken,

    #[error("Wrong token type, expected {expected}")]
    WrongTokenType { expected: TokenType },

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Token encoding failed: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
}
