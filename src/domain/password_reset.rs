//! Password reset codes
//!
//! Short one-time codes that let a user set a new password without logging
//! in. Only a hash of the code is stored.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use uuid::Uuid;

/// Length of a reset code
pub const RESET_CODE_LENGTH: usize = 8;

/// How long a reset code stays valid
pub const RESET_CODE_TTL_MINUTES: i64 = 10;

const RESET_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate an uppercase alphanumeric reset code
pub fn generate_reset_code() -> String {
    let mut rng = rand::thread_rng();
    (0..RESET_CODE_LENGTH)
        .map(|_| RESET_CODE_ALPHABET[rng.gen_range(0..RESET_CODE_ALPHABET.len())] as char)
        .collect()
}

/// Codes are matched case-insensitively and without surrounding whitespace
pub fn canonical_reset_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Stored reset code for one email
#[derive(Debug, Clone)]
pub struct PasswordResetCode {
    pub id: Uuid,
    pub email: String,
    /// PHC hash of the code
    pub code_hash: String,
    pub is_used: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PasswordResetCode {
    /// A fresh, unused code issued at `now`
    pub fn new(email: impl Into<String>, code_hash: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            code_hash,
            is_used: false,
            created_at: now,
            expires_at: now + Duration::minutes(RESET_CODE_TTL_MINUTES),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
