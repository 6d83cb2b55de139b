//! User entity
//!
//! Identity record created on registration and read on login.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::DomainError;

/// Maximum length of first/last name
pub const MAX_NAME_LENGTH: usize = 150;

/// Stored user record
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Public view of the user, without credentials
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }
}

/// User fields safe to return to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Validated input for a user that does not exist yet
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

impl NewUser {
    /// Build a new user, validating and normalizing the email and names.
    ///
    /// The password must already be hashed.
    pub fn new(
        email: &str,
        password_hash: String,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Result<Self, DomainError> {
        let email = normalize_email(email)?;
        let first_name = validate_name("first_name", first_name)?;
        let last_name = validate_name("last_name", last_name)?;

        Ok(Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            first_name,
            last_name,
        })
    }

    /// Materialize the stored record
    pub fn into_user(self, now: DateTime<Utc>) -> User {
        User {
            id: self.id,
            email: self.email,
            password_hash: self.password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Trim and lowercase an email, rejecting anything not shaped like
/// `local@domain.tld`.
pub fn normalize_email(email: &str) -> Result<String, DomainError> {
    let email = email.trim().to_lowercase();

    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| DomainError::invalid_email(email.as_str()))?;

    let domain_ok = !domain.contains('@')
        && domain
            .split_once('.')
            .map(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
            .unwrap_or(false);

    if local.is_empty() || !domain_ok || email.chars().any(char::is_whitespace) {
        return Err(DomainError::invalid_email(email.as_str()));
    }

    Ok(email)
}

/// Reject empty passwords. Strength rules are left to clients.
pub fn validate_password(password: &str) -> Result<(), DomainError> {
    if password.is_empty() {
        return Err(DomainError::EmptyPassword);
    }
    Ok(())
}

fn validate_name(field: &'static str, value: Option<String>) -> Result<String, DomainError> {
    let value = value.map(|v| v.trim().to_string()).unwrap_or_default();
    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(DomainError::FieldTooLong {
            field,
            max: MAX_NAME_LENGTH,
        });
    }
    Ok(value)
}
