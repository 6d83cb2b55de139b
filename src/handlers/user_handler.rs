//! User Handlers
//!
//! Registration and account deletion.

use std::sync::Arc;

use crate::auth::hash_password;
use crate::domain::user::{normalize_email, validate_password};
use crate::domain::{NewUser, OperationContext, UserProfile};
use crate::error::AppError;
use crate::state::AppState;
use crate::store::UserRepository;

use super::{DeleteUserCommand, RegisterUserCommand};

// =========================================================================
// RegisterUserHandler
// =========================================================================

/// Handler for user registration
pub struct RegisterUserHandler {
    users: Arc<dyn UserRepository>,
}

impl RegisterUserHandler {
    pub fn new(state: &AppState) -> Self {
        Self {
            users: state.users.clone(),
        }
    }

    /// Execute the register command
    pub async fn execute(
        &self,
        command: RegisterUserCommand,
        context: &OperationContext,
    ) -> Result<UserProfile, AppError> {
        let email = normalize_email(&command.email)?;
        validate_password(&command.password)?;

        // Check if user already exists
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::Validation(
                "A user with this email already exists".to_string(),
            ));
        }

        let password = command.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))??;

        let new_user = NewUser::new(
            &email,
            password_hash,
            command.first_name,
            command.last_name,
        )?;

        // The unique index still guards a concurrent registration
        let user = self.users.create(new_user).await?;

        tracing::info!(
            user_id = %user.id,
            correlation_id = ?context.correlation_id,
            "User registered"
        );

        Ok(user.profile())
    }
}

// =========================================================================
// DeleteUserHandler
// =========================================================================

/// Handler for account deletion. Users may only delete themselves.
pub struct DeleteUserHandler {
    users: Arc<dyn UserRepository>,
}

impl DeleteUserHandler {
    pub fn new(state: &AppState) -> Self {
        Self {
            users: state.users.clone(),
        }
    }

    pub async fn execute(
        &self,
        command: DeleteUserCommand,
        context: &OperationContext,
    ) -> Result<(), AppError> {
        if command.target_user_id != command.requested_by {
            return Err(AppError::Authorization(
                "You can only delete your own account".to_string(),
            ));
        }

        if !self.users.delete(command.target_user_id).await? {
            return Err(AppError::NotFound(format!(
                "User {} not found",
                command.target_user_id
            )));
        }

        tracing::info!(
            user_id = %command.target_user_id,
            correlation_id = ?context.correlation_id,
            "User deleted"
        );

        Ok(())
    }
}
