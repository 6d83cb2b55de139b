//! Command definitions
//!
//! Commands represent intentions coming in from the API layer; results are
//! what handlers hand back for serialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::TokenPair;
use crate::domain::{TransactionKpi, TransactionSummary, UserProfile};

// =========================================================================
// Users
// =========================================================================

/// Command to register a new user
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUserCommand {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl RegisterUserCommand {
    pub fn new(email: String, password: String) -> Self {
        Self {
            email,
            password,
            first_name: None,
            last_name: None,
        }
    }

    pub fn with_names(mut self, first_name: String, last_name: String) -> Self {
        self.first_name = Some(first_name);
        self.last_name = Some(last_name);
        self
    }
}

/// Command to delete a user account
#[derive(Debug, Clone)]
pub struct DeleteUserCommand {
    /// Account to delete
    pub target_user_id: Uuid,
    /// Authenticated user making the request
    pub requested_by: Uuid,
}

/// Command to issue a password reset code
#[derive(Debug, Clone, Deserialize)]
pub struct RequestPasswordResetCommand {
    pub email: String,
}

/// Command to set a new password with a reset code
#[derive(Debug, Clone, Deserialize)]
pub struct ResetPasswordCommand {
    pub email: String,
    pub code: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// A freshly issued reset code, in plain text
#[derive(Debug, Clone)]
pub struct IssuedResetCode {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

// =========================================================================
// Sessions
// =========================================================================

/// Command to exchange credentials for a token pair
#[derive(Debug, Clone, Deserialize)]
pub struct LoginCommand {
    pub email: String,
    pub password: String,
}

/// Command to revoke a refresh token
#[derive(Debug, Clone)]
pub struct LogoutCommand {
    pub refresh_token: String,
    pub requested_by: Uuid,
}

impl LogoutCommand {
    pub fn new(refresh_token: String, requested_by: Uuid) -> Self {
        Self {
            refresh_token,
            requested_by,
        }
    }
}

/// Result of a successful login
#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub tokens: TokenPair,
    pub user: UserProfile,
}

// =========================================================================
// Belvo
// =========================================================================

/// Query for transactions of one account; every field is required
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionsCommand {
    pub link_id: Option<String>,
    pub account_id: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

/// A sandbox link created and registered for the user
#[derive(Debug, Clone, Serialize)]
pub struct CreatedLink {
    pub id: String,
    pub institution: String,
    pub status: Option<String>,
    pub accounts_registered: usize,
}

/// Result of creating sandbox links
#[derive(Debug, Clone, Serialize)]
pub struct CreateTestLinksResult {
    pub message: String,
    pub links: Vec<CreatedLink>,
}

/// Transactions of one account plus the income/expense KPI
#[derive(Debug, Clone, Serialize)]
pub struct TransactionsReport {
    pub kpi: TransactionKpi,
    pub transactions: Vec<TransactionSummary>,
}
