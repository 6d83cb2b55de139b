//! Session Handlers
//!
//! Login, refresh and logout on top of the JWT service and the
//! revoked-token blacklist.

use std::sync::Arc;

use serde::Serialize;

use crate::auth::{verify_dummy_password, verify_password, AuthError, JwtService, TokenType};
use crate::domain::user::normalize_email;
use crate::domain::OperationContext;
use crate::error::AppError;
use crate::state::AppState;
use crate::store::{TokenBlacklist, UserRepository};

use super::{LoginCommand, LoginResult, LogoutCommand};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

// =========================================================================
// LoginHandler
// =========================================================================

/// Handler for credential login
pub struct LoginHandler {
    users: Arc<dyn UserRepository>,
    jwt: Arc<JwtService>,
}

impl LoginHandler {
    pub fn new(state: &AppState) -> Self {
        Self {
            users: state.users.clone(),
            jwt: state.jwt.clone(),
        }
    }

    pub async fn execute(
        &self,
        command: LoginCommand,
        context: &OperationContext,
    ) -> Result<LoginResult, AppError> {
        let password = command.password;

        // A malformed email can't belong to anyone
        let user = match normalize_email(&command.email) {
            Ok(email) => self.users.find_by_email(&email).await?,
            Err(_) => None,
        };

        let user = match user {
            Some(user) => user,
            None => {
                tokio::task::spawn_blocking(move || verify_dummy_password(&password))
                    .await
                    .map_err(|e| AppError::Internal(e.to_string()))?;
                tracing::info!(correlation_id = ?context.correlation_id, "Login for unknown email");
                return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
            }
        };

        let hash = user.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;

        if !valid {
            tracing::info!(
                user_id = %user.id,
                correlation_id = ?context.correlation_id,
                "Login with wrong password"
            );
            return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
        }

        if !user.is_active {
            return Err(AppError::Authentication(
                "User account is disabled".to_string(),
            ));
        }

        let tokens = self.jwt.issue_pair(user.id)?;

        tracing::info!(
            user_id = %user.id,
            correlation_id = ?context.correlation_id,
            "User logged in"
        );

        Ok(LoginResult {
            tokens,
            user: user.profile(),
        })
    }
}

// =========================================================================
// RefreshHandler
// =========================================================================

/// New access token minted from a refresh token
#[derive(Debug, Clone, Serialize)]
pub struct RefreshResult {
    pub access: String,
}

/// Handler for exchanging a refresh token for an access token
pub struct RefreshHandler {
    users: Arc<dyn UserRepository>,
    revoked: Arc<dyn TokenBlacklist>,
    jwt: Arc<JwtService>,
}

impl RefreshHandler {
    pub fn new(state: &AppState) -> Self {
        Self {
            users: state.users.clone(),
            revoked: state.revoked_tokens.clone(),
            jwt: state.jwt.clone(),
        }
    }

    pub async fn execute(&self, refresh_token: &str) -> Result<RefreshResult, AppError> {
        let claims = self.jwt.decode(refresh_token, TokenType::Refresh)?;

        if self.revoked.is_revoked(claims.jti).await? {
            return Err(AuthError::RevokedToken.into());
        }

        match self.users.find_by_id(claims.sub).await? {
            Some(user) if user.is_active => {}
            _ => {
                return Err(AppError::Authentication(
                    "User not found or inactive".to_string(),
                ))
            }
        }

        let access = self.jwt.issue(claims.sub, TokenType::Access)?;
        Ok(RefreshResult { access })
    }
}

// =========================================================================
// LogoutHandler
// =========================================================================

/// Handler for logout: revokes the refresh token until it expires
pub struct LogoutHandler {
    revoked: Arc<dyn TokenBlacklist>,
    jwt: Arc<JwtService>,
}

impl LogoutHandler {
    pub fn new(state: &AppState) -> Self {
        Self {
            revoked: state.revoked_tokens.clone(),
            jwt: state.jwt.clone(),
        }
    }

    pub async fn execute(
        &self,
        command: LogoutCommand,
        context: &OperationContext,
    ) -> Result<(), AppError> {
        let claims = self
            .jwt
            .decode(&command.refresh_token, TokenType::Refresh)
            .map_err(|e| AppError::Validation(e.to_string()))?;

        if claims.sub != command.requested_by {
            return Err(AppError::Authorization(
                "Refresh token belongs to another user".to_string(),
            ));
        }

        if self.revoked.is_revoked(claims.jti).await? {
            return Err(AppError::Validation(
                AuthError::RevokedToken.to_string(),
            ));
        }

        self.revoked
            .revoke(claims.jti, claims.sub, claims.expires_at())
            .await?;

        tracing::info!(
            user_id = %claims.sub,
            correlation_id = ?context.correlation_id,
            "User logged out"
        );

        Ok(())
    }
}
