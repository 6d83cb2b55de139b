//! Link entity
//!
//! A Belvo-issued identifier for one user-to-bank connection.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Link recorded in the registry for a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    /// Opaque id issued by Belvo
    pub id: String,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    /// Institution code the link was created against (e.g. `erebor_mx_retail`)
    pub institution: String,
    pub created_at: DateTime<Utc>,
}

impl Link {
    pub fn new(id: impl Into<String>, user_id: Uuid, institution: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_id,
            institution: institution.into(),
            created_at: Utc::now(),
        }
    }
}
