/// In-memory stores for tests and database-less local runs.
///
/// Locks are held for a single map operation and never across an `.await`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{Credential, CredentialStore, RefreshTokenRecord, RefreshTokenRepository};
use crate::error::{AppError, DatabaseError};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, AppError> {
    mutex
        .lock()
        .map_err(|_| DatabaseError::UnexpectedError("in-memory store lock poisoned".to_string()).into())
}

#[derive(Default)]
pub struct InMemoryCredentialStore {
    users: Mutex<HashMap<Uuid, Credential>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user; returns its id
    pub fn insert_user(&self, email: &str, hashed_password: &str) -> Result<Uuid, AppError> {
        let user_id = Uuid::new_v4();
        lock(&self.users)?.insert(
            user_id,
            Credential {
                user_id,
                email: email.to_string(),
                hashed_password: hashed_password.to_string(),
            },
        );
        Ok(user_id)
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>, AppError> {
        Ok(lock(&self.users)?
            .values()
            .find(|credential| credential.email == email)
            .cloned())
    }

    async fn update_password(&self, user_id: Uuid, hashed_password: &str) -> Result<(), AppError> {
        let mut users = lock(&self.users)?;
        let credential = users
            .get_mut(&user_id)
            .ok_or_else(|| DatabaseError::NotFound("user".to_string()))?;
        credential.hashed_password = hashed_password.to_string();
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryRefreshTokenRepository {
    rows: Mutex<HashMap<String, RefreshTokenRecord>>,
}

impl InMemoryRefreshTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RefreshTokenRepository for InMemoryRefreshTokenRepository {
    async fn insert(&self, record: &RefreshTokenRecord) -> Result<(), AppError> {
        let mut rows = lock(&self.rows)?;
        if rows.contains_key(&record.token_hash) {
            return Err(DatabaseError::QueryExecution(
                "duplicate key value violates unique constraint \"refresh_tokens_pkey\"".to_string(),
            )
            .into());
        }
        rows.insert(record.token_hash.clone(), record.clone());
        Ok(())
    }

    async fn find(&self, token_hash: &str) -> Result<Option<RefreshTokenRecord>, AppError> {
        Ok(lock(&self.rows)?.get(token_hash).cloned())
    }

    async fn mark_revoked(
        &self,
        token_hash: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut rows = lock(&self.rows)?;
        match rows.get_mut(token_hash) {
            Some(row) if row.revoked_at.is_none() => {
                row.revoked_at = Some(revoked_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_all_for_user(
        &self,
        user_id: Uuid,
        revoked_at: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let mut rows = lock(&self.rows)?;
        let mut revoked = 0;
        for row in rows.values_mut() {
            if row.user_id == user_id && row.is_live(revoked_at) {
                row.revoked_at = Some(revoked_at);
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn delete_all(&self) -> Result<u64, AppError> {
        let mut rows = lock(&self.rows)?;
        let count = rows.len() as u64;
        rows.clear();
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(token_hash: &str, user_id: Uuid, now: DateTime<Utc>) -> RefreshTokenRecord {
        RefreshTokenRecord {
            token_hash: token_hash.to_string(),
            user_id,
            created_at: now,
            expires_at: now + Duration::days(60),
            revoked_at: None,
        }
    }

    #[tokio::test]
    async fn test_mark_revoked_only_once() {
        let repo = InMemoryRefreshTokenRepository::new();
        let now = Utc::now();
        repo.insert(&record("a", Uuid::new_v4(), now)).await.unwrap();

        assert!(repo.mark_revoked("a", now).await.unwrap());
        assert!(!repo.mark_revoked("a", now + Duration::seconds(5)).await.unwrap());

        let row = repo.find("a").await.unwrap().unwrap();
        assert_eq!(row.revoked_at, Some(now));
    }

    #[tokio::test]
    async fn test_mark_revoked_missing_row() {
        let repo = InMemoryRefreshTokenRepository::new();
        assert!(!repo.mark_revoked("missing", Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let repo = InMemoryRefreshTokenRepository::new();
        let now = Utc::now();
        repo.insert(&record("a", Uuid::new_v4(), now)).await.unwrap();

        let result = repo.insert(&record("a", Uuid::new_v4(), now)).await;

        assert!(matches!(result, Err(AppError::Database(_))));
    }

    #[tokio::test]
    async fn test_revoke_all_for_user_skips_other_users() {
        let repo = InMemoryRefreshTokenRepository::new();
        let now = Utc::now();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        repo.insert(&record("a1", alice, now)).await.unwrap();
        repo.insert(&record("a2", alice, now)).await.unwrap();
        repo.insert(&record("b1", bob, now)).await.unwrap();

        assert_eq!(repo.revoke_all_for_user(alice, now).await.unwrap(), 2);
        assert!(repo.find("b1").await.unwrap().unwrap().revoked_at.is_none());
    }

    #[tokio::test]
    async fn test_delete_all() {
        let repo = InMemoryRefreshTokenRepository::new();
        repo.insert(&record("a", Uuid::new_v4(), Utc::now())).await.unwrap();

        assert_eq!(repo.delete_all().await.unwrap(), 1);
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_credential_update_unknown_user() {
        let store = InMemoryCredentialStore::new();
        let result = store.update_password(Uuid::new_v4(), "hash").await;

        assert!(matches!(result, Err(AppError::Database(DatabaseError::NotFound(_)))));
    }

    #[tokio::test]
    async fn test_credential_lookup_by_email() {
        let store = InMemoryCredentialStore::new();
        let user_id = store.insert_user("walt@breakingbad.com", "hash").unwrap();

        let found = store.find_by_email("walt@breakingbad.com").await.unwrap().unwrap();

        assert_eq!(found.user_id, user_id);
        assert!(store.find_by_email("jesse@breakingbad.com").await.unwrap().is_none());
    }
}
