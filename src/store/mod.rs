/// Storage collaborators
///
/// The session core never owns user rows and only sees refresh token rows
/// through `RefreshTokenRepository`. Both traits have a PostgreSQL
/// implementation and an in-memory one.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;

pub use memory::{InMemoryCredentialStore, InMemoryRefreshTokenRepository};
pub use postgres::{PgCredentialStore, PgRefreshTokenRepository};

/// A user's login identity and password hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

/// Persisted refresh token row, keyed by the SHA-256 of the token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub token_hash: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshTokenRecord {
    /// Usable iff never revoked and not yet expired
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>, AppError>;

    /// # Errors
    /// `DatabaseError::NotFound` when no user has this id
    async fn update_password(&self, user_id: Uuid, hashed_password: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    async fn insert(&self, record: &RefreshTokenRecord) -> Result<(), AppError>;

    async fn find(&self, token_hash: &str) -> Result<Option<RefreshTokenRecord>, AppError>;

    /// Set `revoked_at` only if it is still unset.
    ///
    /// Returns `false` when the row is missing or was already revoked.
    async fn mark_revoked(&self, token_hash: &str, revoked_at: DateTime<Utc>)
        -> Result<bool, AppError>;

    /// Revoke every live token of a user; returns how many were revoked
    async fn revoke_all_for_user(
        &self,
        user_id: Uuid,
        revoked_at: DateTime<Utc>,
    ) -> Result<u64, AppError>;

    /// Administrative reset
    async fn delete_all(&self) -> Result<u64, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(now: DateTime<Utc>) -> RefreshTokenRecord {
        RefreshTokenRecord {
            token_hash: "hash".to_string(),
            user_id: Uuid::new_v4(),
            created_at: now,
            expires_at: now + Duration::days(60),
            revoked_at: None,
        }
    }

    #[test]
    fn test_fresh_record_is_live() {
        let now = Utc::now();
        assert!(record(now).is_live(now));
    }

    #[test]
    fn test_revoked_record_is_not_live() {
        let now = Utc::now();
        let mut record = record(now);
        record.revoked_at = Some(now);

        assert!(!record.is_live(now));
    }

    #[test]
    fn test_record_dead_at_expiry_instant() {
        let now = Utc::now();
        let record = record(now);

        assert!(record.is_live(record.expires_at - Duration::seconds(1)));
        assert!(!record.is_live(record.expires_at));
        assert!(record.is_expired(record.expires_at));
    }
}
