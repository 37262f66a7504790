/// PostgreSQL-backed stores
///
/// `users` is owned by the user service; only the `id`, `email` and
/// `hashed_password` columns are touched here. `refresh_tokens` is created by
/// the migrations in `./migrations`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{Credential, CredentialStore, RefreshTokenRecord, RefreshTokenRepository};
use crate::error::{AppError, DatabaseError};

#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>, AppError> {
        let row = sqlx::query_as::<_, (Uuid, String, String)>(
            "SELECT id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(user_id, email, hashed_password)| Credential {
            user_id,
            email,
            hashed_password,
        }))
    }

    async fn update_password(&self, user_id: Uuid, hashed_password: &str) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET hashed_password = $1, updated_at = $2
            WHERE id = $3
            "#,
        )
        .bind(hashed_password)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("user".to_string()).into());
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgRefreshTokenRepository {
    pool: PgPool,
}

impl PgRefreshTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenRepository for PgRefreshTokenRepository {
    async fn insert(&self, record: &RefreshTokenRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token_hash, user_id, created_at, expires_at, revoked_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&record.token_hash)
        .bind(record.user_id)
        .bind(record.created_at)
        .bind(record.expires_at)
        .bind(record.revoked_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, token_hash: &str) -> Result<Option<RefreshTokenRecord>, AppError> {
        let row = sqlx::query_as::<
            _,
            (String, Uuid, DateTime<Utc>, DateTime<Utc>, Option<DateTime<Utc>>),
        >(
            r#"
            SELECT token_hash, user_id, created_at, expires_at, revoked_at
            FROM refresh_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(token_hash, user_id, created_at, expires_at, revoked_at)| RefreshTokenRecord {
                token_hash,
                user_id,
                created_at,
                expires_at,
                revoked_at,
            },
        ))
    }

    async fn mark_revoked(
        &self,
        token_hash: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        // Conditional update: two racing revokes cannot both win
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = $1
            WHERE token_hash = $2 AND revoked_at IS NULL
            "#,
        )
        .bind(revoked_at)
        .bind(token_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn revoke_all_for_user(
        &self,
        user_id: Uuid,
        revoked_at: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = $1
            WHERE user_id = $2 AND revoked_at IS NULL AND expires_at > $1
            "#,
        )
        .bind(revoked_at)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_all(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM refresh_tokens")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
