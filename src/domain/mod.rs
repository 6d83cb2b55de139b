//! Domain module
//!
//! Core domain types: users, password reset codes, links, normalized
//! accounts and transactions.

pub mod account;
pub mod context;
pub mod error;
pub mod link;
pub mod password_reset;
pub mod transaction;
pub mod user;

pub use account::{Institution, NormalizedAccount};
pub use context::OperationContext;
pub use error::DomainError;
pub use link::Link;
pub use password_reset::PasswordResetCode;
pub use transaction::{TransactionDetail, TransactionKpi, TransactionSummary};
pub use user::{NewUser, User, UserProfile};
