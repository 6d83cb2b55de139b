//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use thiserror::Error;

/// Validation failures raised while building domain values from user input.
///
/// These errors are independent of the web/infrastructure layer and always
/// map to a client error at the HTTP boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Email is empty or not shaped like `local@domain.tld`
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    /// Password is empty
    #[error("Password must not be empty")]
    EmptyPassword,

    /// A name field exceeds the storage limit
    #[error("{field} must be at most {max} characters")]
    FieldTooLong { field: &'static str, max: usize },

    /// A required query or body parameter is missing
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
}

impl DomainError {
    /// Create an invalid email error
    pub fn invalid_email(email: impl Into<String>) -> Self {
        Self::InvalidEmail(email.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_email_message() {
        let err = DomainError::invalid_email("not-an-email");
        assert!(err.to_string().contains("not-an-email"));
    }

    #[test]
    fn test_field_too_long_message() {
        let err = DomainError::FieldTooLong {
            field: "first_name",
            max: 150,
        };
        assert_eq!(err.to_string(), "first_name must be at most 150 characters");
    }
}
