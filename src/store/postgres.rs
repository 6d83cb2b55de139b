//! PostgreSQL store
//!
//! Plain sqlx queries against the schema in `migrations/`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Link, NewUser, PasswordResetCode, User};

use super::{LinkRegistry, ResetCodeStore, StoreError, TokenBlacklist, UserRepository};

type UserRow = (
    Uuid,
    String,
    String,
    String,
    String,
    bool,
    DateTime<Utc>,
    DateTime<Utc>,
);

fn user_from_row(row: UserRow) -> User {
    let (id, email, password_hash, first_name, last_name, is_active, created_at, updated_at) = row;
    User {
        id,
        email,
        password_hash,
        first_name,
        last_name,
        is_active,
        created_at,
        updated_at,
    }
}

/// Store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let row: Result<UserRow, sqlx::Error> = sqlx::query_as(
            r#"
            INSERT INTO users (id, email, password_hash, first_name, last_name, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, TRUE, NOW(), NOW())
            RETURNING id, email, password_hash, first_name, last_name, is_active, created_at, updated_at
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .fetch_one(&self.pool)
        .await;

        match row {
            Ok(row) => Ok(user_from_row(row)),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::DuplicateEmail(user.email))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, email, password_hash, first_name, last_name, is_active, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(user_from_row))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, email, password_hash, first_name, last_name, is_active, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(user_from_row))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        // belvo_links, revoked_tokens and password_reset_codes cascade
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

type ResetCodeRow = (Uuid, String, String, bool, DateTime<Utc>, DateTime<Utc>);

#[async_trait]
impl ResetCodeStore for PgStore {
    async fn save_code(&self, code: PasswordResetCode) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO password_reset_codes (id, email, code_hash, is_used, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(code.id)
        .bind(&code.email)
        .bind(&code.code_hash)
        .bind(code.is_used)
        .bind(code.created_at)
        .bind(code.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn latest_code(&self, email: &str) -> Result<Option<PasswordResetCode>, StoreError> {
        let row: Option<ResetCodeRow> = sqlx::query_as(
            r#"
            SELECT id, email, code_hash, is_used, created_at, expires_at
            FROM password_reset_codes
            WHERE email = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(id, email, code_hash, is_used, created_at, expires_at)| PasswordResetCode {
                id,
                email,
                code_hash,
                is_used,
                created_at,
                expires_at,
            },
        ))
    }

    async fn consume_code(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE password_reset_codes SET is_used = TRUE WHERE id = $1 AND is_used = FALSE",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired_codes(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM password_reset_codes WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl LinkRegistry for PgStore {
    async fn record(&self, link: Link) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO belvo_links (id, user_id, institution, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET user_id = EXCLUDED.user_id, institution = EXCLUDED.institution
            "#,
        )
        .bind(&link.id)
        .bind(link.user_id)
        .bind(&link.institution)
        .bind(link.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn links_for_user(&self, user_id: Uuid) -> Result<Vec<Link>, StoreError> {
        let rows: Vec<(String, Uuid, String, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT id, user_id, institution, created_at
            FROM belvo_links
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, user_id, institution, created_at)| Link {
                id,
                user_id,
                institution,
                created_at,
            })
            .collect())
    }

    async fn find_for_user(
        &self,
        user_id: Uuid,
        link_id: &str,
    ) -> Result<Option<Link>, StoreError> {
        let row: Option<(String, Uuid, String, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT id, user_id, institution, created_at
            FROM belvo_links
            WHERE user_id = $1 AND id = $2
            "#,
        )
        .bind(user_id)
        .bind(link_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, user_id, institution, created_at)| Link {
            id,
            user_id,
            institution,
            created_at,
        }))
    }
}

#[async_trait]
impl TokenBlacklist for PgStore {
    async fn revoke(
        &self,
        jti: Uuid,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO revoked_tokens (jti, user_id, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (jti) DO NOTHING
            "#,
        )
        .bind(jti)
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn is_revoked(&self, jti: Uuid) -> Result<bool, StoreError> {
        let revoked: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM revoked_tokens WHERE jti = $1)")
                .bind(jti)
                .fetch_one(&self.pool)
                .await?;

        Ok(revoked)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
