//! Persistence ports
//!
//! Repository traits for users, password reset codes, the link registry and
//! revoked refresh tokens, with a PostgreSQL implementation and an in-memory
//! one for development and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Link, NewUser, PasswordResetCode, User};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// User persistence
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. Fails with `DuplicateEmail` if the email is taken.
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Replace the stored password hash. Returns false if absent.
    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, StoreError>;

    /// Delete a user and everything they own. Returns false if absent.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

/// One-time password reset codes
#[async_trait]
pub trait ResetCodeStore: Send + Sync {
    async fn save_code(&self, code: PasswordResetCode) -> Result<(), StoreError>;

    /// Most recently issued code for an email. Older codes are superseded.
    async fn latest_code(&self, email: &str) -> Result<Option<PasswordResetCode>, StoreError>;

    /// Mark a code used. Returns false if it was already used or is absent.
    async fn consume_code(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Drop codes past their expiry. Returns rows removed.
    async fn purge_expired_codes(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// Which Belvo links exist, and for whom
#[async_trait]
pub trait LinkRegistry: Send + Sync {
    async fn record(&self, link: Link) -> Result<(), StoreError>;

    /// All links of a user, oldest first
    async fn links_for_user(&self, user_id: Uuid) -> Result<Vec<Link>, StoreError>;

    /// A single link, only if it belongs to the user
    async fn find_for_user(&self, user_id: Uuid, link_id: &str)
        -> Result<Option<Link>, StoreError>;
}

/// Refresh tokens invalidated by logout
#[async_trait]
pub trait TokenBlacklist: Send + Sync {
    async fn revoke(
        &self,
        jti: Uuid,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn is_revoked(&self, jti: Uuid) -> Result<bool, StoreError>;

    /// Drop entries whose token has expired anyway. Returns rows removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}
