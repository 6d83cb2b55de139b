//! In-memory store
//!
//! Used when no `DATABASE_URL` is configured, and by the test suite.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{Link, NewUser, PasswordResetCode, User};

use super::{LinkRegistry, ResetCodeStore, StoreError, TokenBlacklist, UserRepository};

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    links: Vec<Link>,
    revoked: HashMap<Uuid, (Uuid, DateTime<Utc>)>,
    reset_codes: Vec<PasswordResetCode>,
}

/// Process-local store; clones share the same data
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;

        if inner.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail(user.email));
        }

        let user = user.into_user(Utc::now());
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.users.get_mut(&id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(user) = inner.users.remove(&id) else {
            return Ok(false);
        };
        inner.links.retain(|link| link.user_id != id);
        inner.revoked.retain(|_, (user_id, _)| *user_id != id);
        inner.reset_codes.retain(|code| code.email != user.email);
        Ok(true)
    }
}

#[async_trait]
impl ResetCodeStore for MemoryStore {
    async fn save_code(&self, code: PasswordResetCode) -> Result<(), StoreError> {
        self.inner.write().await.reset_codes.push(code);
        Ok(())
    }

    async fn latest_code(&self, email: &str) -> Result<Option<PasswordResetCode>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .reset_codes
            .iter()
            .filter(|code| code.email == email)
            .max_by_key(|code| code.created_at)
            .cloned())
    }

    async fn consume_code(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.reset_codes.iter_mut().find(|code| code.id == id) {
            Some(code) if !code.is_used => {
                code.is_used = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn purge_expired_codes(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let before = inner.reset_codes.len();
        inner.reset_codes.retain(|code| !code.is_expired(now));
        Ok((before - inner.reset_codes.len()) as u64)
    }
}

#[async_trait]
impl LinkRegistry for MemoryStore {
    async fn record(&self, link: Link) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        match inner.links.iter_mut().find(|l| l.id == link.id) {
            Some(existing) => *existing = link,
            None => inner.links.push(link),
        }
        Ok(())
    }

    async fn links_for_user(&self, user_id: Uuid) -> Result<Vec<Link>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .links
            .iter()
            .filter(|link| link.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_for_user(
        &self,
        user_id: Uuid,
        link_id: &str,
    ) -> Result<Option<Link>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .links
            .iter()
            .find(|link| link.user_id == user_id && link.id == link_id)
            .cloned())
    }
}

#[async_trait]
impl TokenBlacklist for MemoryStore {
    async fn revoke(
        &self,
        jti: Uuid,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .revoked
            .insert(jti, (user_id, expires_at));
        Ok(())
    }

    async fn is_revoked(&self, jti: Uuid) -> Result<bool, StoreError> {
        Ok(self.inner.read().await.revoked.contains_key(&jti))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let before = inner.revoked.len();
        inner.revoked.retain(|_, (_, expires_at)| *expires_at > now);
        Ok((before - inner.revoked.len()) as u64)
    }
}
