//! Password Reset Handlers
//!
//! Issue a one-time code for an email, then trade it for a new password.

use std::sync::Arc;

use chrono::Utc;

use crate::auth::{hash_password, verify_password};
use crate::domain::password_reset::{canonical_reset_code, generate_reset_code};
use crate::domain::user::{normalize_email, validate_password};
use crate::domain::{OperationContext, PasswordResetCode, User};
use crate::error::AppError;
use crate::state::AppState;
use crate::store::{ResetCodeStore, UserRepository};

use super::{IssuedResetCode, RequestPasswordResetCommand, ResetPasswordCommand};

const INVALID_CODE: &str = "Invalid reset code";

async fn user_by_email(users: &dyn UserRepository, email: &str) -> Result<User, AppError> {
    users
        .find_by_email(email)
        .await?
        .ok_or_else(|| AppError::NotFound("No user exists with this email".to_string()))
}

async fn hash_blocking(secret: String) -> Result<String, AppError> {
    let hash = tokio::task::spawn_blocking(move || hash_password(&secret))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(hash)
}

// =========================================================================
// RequestPasswordResetHandler
// =========================================================================

/// Handler that issues reset codes
pub struct RequestPasswordResetHandler {
    users: Arc<dyn UserRepository>,
    codes: Arc<dyn ResetCodeStore>,
}

impl RequestPasswordResetHandler {
    pub fn new(state: &AppState) -> Self {
        Self {
            users: state.users.clone(),
            codes: state.reset_codes.clone(),
        }
    }

    /// Issue a new code for the email, superseding any earlier one
    pub async fn execute(
        &self,
        command: RequestPasswordResetCommand,
        context: &OperationContext,
    ) -> Result<IssuedResetCode, AppError> {
        let email = normalize_email(&command.email)?;
        let user = user_by_email(self.users.as_ref(), &email).await?;

        let code = generate_reset_code();
        let code_hash = hash_blocking(code.clone()).await?;

        let stored = PasswordResetCode::new(email, code_hash, Utc::now());
        let expires_at = stored.expires_at;
        self.codes.save_code(stored).await?;

        tracing::info!(
            user_id = %user.id,
            correlation_id = ?context.correlation_id,
            %expires_at,
            "Password reset code issued"
        );

        Ok(IssuedResetCode { code, expires_at })
    }
}

// =========================================================================
// ResetPasswordHandler
// =========================================================================

/// Handler that sets a new password from a reset code
pub struct ResetPasswordHandler {
    users: Arc<dyn UserRepository>,
    codes: Arc<dyn ResetCodeStore>,
}

impl ResetPasswordHandler {
    pub fn new(state: &AppState) -> Self {
        Self {
            users: state.users.clone(),
            codes: state.reset_codes.clone(),
        }
    }

    pub async fn execute(
        &self,
        command: ResetPasswordCommand,
        context: &OperationContext,
    ) -> Result<(), AppError> {
        let email = normalize_email(&command.email)?;
        validate_password(&command.new_password)?;

        if command.new_password != command.confirm_password {
            return Err(AppError::Validation("Passwords do not match".to_string()));
        }

        let user = user_by_email(self.users.as_ref(), &email).await?;

        let stored = self
            .codes
            .latest_code(&email)
            .await?
            .ok_or_else(|| AppError::Validation(INVALID_CODE.to_string()))?;

        let code = canonical_reset_code(&command.code);
        let code_hash = stored.code_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&code, &code_hash))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;

        if !matches {
            tracing::info!(
                user_id = %user.id,
                correlation_id = ?context.correlation_id,
                "Password reset with wrong code"
            );
            return Err(AppError::Validation(INVALID_CODE.to_string()));
        }

        if stored.is_used {
            return Err(AppError::Validation(
                "Reset code has already been used".to_string(),
            ));
        }

        if stored.is_expired(Utc::now()) {
            return Err(AppError::Validation("Reset code has expired".to_string()));
        }

        // Claim the code before touching the password; a concurrent reset
        // with the same code loses here
        if !self.codes.consume_code(stored.id).await? {
            return Err(AppError::Validation(
                "Reset code has already been used".to_string(),
            ));
        }

        let password_hash = hash_blocking(command.new_password).await?;
        if !self.users.update_password(user.id, &password_hash).await? {
            return Err(AppError::NotFound(
                "No user exists with this email".to_string(),
            ));
        }

        tracing::info!(
            user_id = %user.id,
            correlation_id = ?context.correlation_id,
            "Password reset"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::password_reset::RESET_CODE_LENGTH;
    use crate::handlers::tests::test_state;
    use crate::handlers::{LoginCommand, LoginHandler, RegisterUserCommand, RegisterUserHandler};
    use chrono::Duration;

    async fn registered(state: &AppState) {
        RegisterUserHandler::new(state)
            .execute(
                RegisterUserCommand::new("ana@example.com".to_string(), "old".to_string()),
                &OperationContext::new(),
            )
            .await
            .unwrap();
    }

    async fn request_code(state: &AppState) -> IssuedResetCode {
        RequestPasswordResetHandler::new(state)
            .execute(
                RequestPasswordResetCommand {
                    email: "Ana@Example.com".to_string(),
                },
                &OperationContext::new(),
            )
            .await
            .unwrap()
    }

    fn reset(code: &str, new_password: &str, confirm_password: &str) -> ResetPasswordCommand {
        ResetPasswordCommand {
            email: "ana@example.com".to_string(),
            code: code.to_string(),
            new_password: new_password.to_string(),
            confirm_password: confirm_password.to_string(),
        }
    }

    async fn can_login(state: &AppState, password: &str) -> bool {
        LoginHandler::new(state)
            .execute(
                LoginCommand {
                    email: "ana@example.com".to_string(),
                    password: password.to_string(),
                },
                &OperationContext::new(),
            )
            .await
            .is_ok()
    }

    #[tokio::test]
    async fn test_reset_changes_password() {
        let state = test_state();
        registered(&state).await;

        let issued = request_code(&state).await;
        assert_eq!(issued.code.len(), RESET_CODE_LENGTH);

        ResetPasswordHandler::new(&state)
            .execute(
                reset(&issued.code.to_lowercase(), "new", "new"),
                &OperationContext::new(),
            )
            .await
            .unwrap();

        assert!(can_login(&state, "new").await);
        assert!(!can_login(&state, "old").await);
    }

    #[tokio::test]
    async fn test_code_is_single_use() {
        let state = test_state();
        registered(&state).await;
        let issued = request_code(&state).await;
        let handler = ResetPasswordHandler::new(&state);

        handler
            .execute(reset(&issued.code, "new", "new"), &OperationContext::new())
            .await
            .unwrap();

        let err = handler
            .execute(reset(&issued.code, "other", "other"), &OperationContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref msg) if msg.contains("already been used")));
        assert!(can_login(&state, "new").await);
    }

    #[tokio::test]
    async fn test_expired_code_rejected() {
        let state = test_state();
        registered(&state).await;

        let code_hash = hash_password("EXPIRED1").unwrap();
        let issued_at = Utc::now() - Duration::minutes(11);
        state
            .reset_codes
            .save_code(PasswordResetCode::new("ana@example.com", code_hash, issued_at))
            .await
            .unwrap();

        let err = ResetPasswordHandler::new(&state)
            .execute(reset("EXPIRED1", "new", "new"), &OperationContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref msg) if msg.contains("expired")));
        assert!(can_login(&state, "old").await);
    }

    #[tokio::test]
    async fn test_confirm_mismatch_rejected() {
        let state = test_state();
        registered(&state).await;
        let issued = request_code(&state).await;

        let err = ResetPasswordHandler::new(&state)
            .execute(reset(&issued.code, "new", "typo"), &OperationContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref msg) if msg == "Passwords do not match"));

        // The code was not spent by the failed attempt
        ResetPasswordHandler::new(&state)
            .execute(reset(&issued.code, "new", "new"), &OperationContext::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wrong_and_superseded_codes_rejected() {
        let state = test_state();
        registered(&state).await;
        let first = request_code(&state).await;
        let second = request_code(&state).await;
        let handler = ResetPasswordHandler::new(&state);

        if first.code != second.code {
            let err = handler
                .execute(reset(&first.code, "new", "new"), &OperationContext::new())
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(ref msg) if msg == INVALID_CODE));
        }

        handler
            .execute(reset(&second.code, "new", "new"), &OperationContext::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unknown_email_not_found() {
        let state = test_state();

        let err = RequestPasswordResetHandler::new(&state)
            .execute(
                RequestPasswordResetCommand {
                    email: "nobody@example.com".to_string(),
                },
                &OperationContext::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = ResetPasswordHandler::new(&state)
            .execute(
                ResetPasswordCommand {
                    email: "nobody@example.com".to_string(),
                    code: "ABCD1234".to_string(),
                    new_password: "new".to_string(),
                    confirm_password: "new".to_string(),
                },
                &OperationContext::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
