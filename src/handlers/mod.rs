//! Command Handlers module
//!
//! Handlers that orchestrate business operations.
//! Each handler coordinates the repositories, the token service and the
//! Belvo client it needs, taken from the shared state.

mod auth_handler;
mod belvo_handler;
mod commands;
mod password_reset_handler;
mod user_handler;

#[cfg(test)]
pub(crate) mod tests;

pub use auth_handler::{LoginHandler, LogoutHandler, RefreshHandler, RefreshResult};
pub use belvo_handler::AggregationHandler;
pub use commands::*;
pub use password_reset_handler::{RequestPasswordResetHandler, ResetPasswordHandler};
pub use user_handler::{DeleteUserHandler, RegisterUserHandler};
