/// Refresh Token Management
///
/// Refresh tokens are:
/// - 256 bits from the OS CSPRNG, hex encoded
/// - Hashed with SHA-256 before storage (the plaintext only ever goes to the client)
/// - Revocable exactly once; `revoked_at` is never cleared
/// - Expired by comparing `expires_at` with the injected clock, never swept

use chrono::Duration;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{AppError, RefreshTokenError};
use crate::store::{RefreshTokenRecord, RefreshTokenRepository};

const REFRESH_TOKEN_BYTES: usize = 32;

/// Generate new refresh token material
///
/// # Errors
/// Returns an internal error if the OS random source fails
pub fn generate_refresh_token() -> Result<String, AppError> {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| AppError::Internal(format!("Random source failed: {}", e)))?;
    Ok(hex::encode(bytes))
}

/// Hash a refresh token using SHA-256
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Issues, looks up and revokes refresh tokens
#[derive(Clone)]
pub struct RefreshTokenStore {
    repository: Arc<dyn RefreshTokenRepository>,
    clock: Arc<dyn Clock>,
    lifetime: Duration,
}

impl RefreshTokenStore {
    pub fn new(
        repository: Arc<dyn RefreshTokenRepository>,
        clock: Arc<dyn Clock>,
        lifetime: Duration,
    ) -> Self {
        Self {
            repository,
            clock,
            lifetime,
        }
    }

    /// Mint and persist a refresh token for `user_id`
    ///
    /// The plaintext is only returned after the row is stored.
    pub async fn issue(&self, user_id: Uuid) -> Result<String, AppError> {
        let token = generate_refresh_token()?;
        let now = self.clock.now();

        let record = RefreshTokenRecord {
            token_hash: hash_token(&token),
            user_id,
            created_at: now,
            expires_at: now + self.lifetime,
            revoked_at: None,
        };
        self.repository.insert(&record).await?;

        tracing::debug!(user_id = %user_id, expires_at = %record.expires_at, "Refresh token issued");
        Ok(token)
    }

    /// # Errors
    /// `RefreshTokenError::NotFound` if no row matches
    pub async fn lookup(&self, token: &str) -> Result<RefreshTokenRecord, AppError> {
        self.repository
            .find(&hash_token(token))
            .await?
            .ok_or_else(|| RefreshTokenError::NotFound.into())
    }

    pub fn is_live(&self, record: &RefreshTokenRecord) -> bool {
        record.is_live(self.clock.now())
    }

    /// Revoke a token exactly once
    ///
    /// # Errors
    /// - `NotFound` if no row matches
    /// - `AlreadyExpired` if the token expired before this call (nothing is written)
    /// - `AlreadyRevoked` if it was revoked earlier, including by a concurrent caller
    pub async fn revoke(&self, token: &str) -> Result<RefreshTokenRecord, AppError> {
        let mut record = self.lookup(token).await?;
        let now = self.clock.now();

        if record.is_expired(now) {
            tracing::warn!(user_id = %record.user_id, "Revoke attempted on expired refresh token");
            return Err(RefreshTokenError::AlreadyExpired.into());
        }

        if record.revoked_at.is_some() {
            tracing::warn!(user_id = %record.user_id, "Revoke attempted on revoked refresh token");
            return Err(RefreshTokenError::AlreadyRevoked.into());
        }

        if !self.repository.mark_revoked(&record.token_hash, now).await? {
            tracing::warn!(user_id = %record.user_id, "Lost revoke race for refresh token");
            return Err(RefreshTokenError::AlreadyRevoked.into());
        }

        record.revoked_at = Some(now);
        tracing::info!(user_id = %record.user_id, "Refresh token revoked");
        Ok(record)
    }

    /// Revoke every live refresh token of a user
    pub async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        let revoked = self
            .repository
            .revoke_all_for_user(user_id, self.clock.now())
            .await?;

        tracing::info!(user_id = %user_id, revoked, "All refresh tokens revoked for user");
        Ok(revoked)
    }

    /// Drop every row. Administrative reset only.
    pub async fn purge(&self) -> Result<u64, AppError> {
        let deleted = self.repository.delete_all().await?;
        tracing::warn!(deleted, "Refresh token table purged");
        Ok(deleted)
    }
}
