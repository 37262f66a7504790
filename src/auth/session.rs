/// Session operations exposed to request handlers
///
/// Composes the password hasher, the access token codec, the refresh token
/// store and the bearer parser. Everything is constructed once at startup
/// and passed in; nothing here reads globals.

use chrono::Duration;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::bearer::extract_bearer_token;
use crate::auth::jwt::AccessTokenCodec;
use crate::auth::password::PasswordHasher;
use crate::auth::refresh_token::RefreshTokenStore;
use crate::clock::Clock;
use crate::configuration::AuthSettings;
use crate::error::{AppError, AuthError, RefreshTokenError};
use crate::store::{Credential, CredentialStore, RefreshTokenRepository};
use crate::validators::parse_email;

/// Token pair handed out at login
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of a refresh call. `refresh_token` is only set when rotation is on.
#[derive(Debug, Clone)]
pub struct RefreshedSession {
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: Option<String>,
}

#[derive(Clone)]
pub struct SessionService {
    credentials: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    access_tokens: AccessTokenCodec,
    refresh_tokens: RefreshTokenStore,
    rotate_refresh_tokens: bool,
}

impl SessionService {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        hasher: PasswordHasher,
        access_tokens: AccessTokenCodec,
        refresh_tokens: RefreshTokenStore,
        rotate_refresh_tokens: bool,
    ) -> Self {
        Self {
            credentials,
            hasher,
            access_tokens,
            refresh_tokens,
            rotate_refresh_tokens,
        }
    }

    /// Build the service from validated settings
    pub fn from_settings(
        settings: &AuthSettings,
        credentials: Arc<dyn CredentialStore>,
        refresh_repository: Arc<dyn RefreshTokenRepository>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        settings.validate()?;

        let hasher = PasswordHasher::new(settings.hashing_cost);
        hasher.warm_up();

        Ok(Self::new(
            credentials,
            hasher,
            AccessTokenCodec::from_settings(settings, clock.clone()),
            RefreshTokenStore::new(
                refresh_repository,
                clock,
                Duration::days(settings.refresh_token_ttl_days),
            ),
            settings.rotate_refresh_tokens,
        ))
    }

    pub fn refresh_tokens(&self) -> &RefreshTokenStore {
        &self.refresh_tokens
    }

    /// Mint an access token and persist a fresh refresh token for `user_id`
    pub async fn issue_session(&self, user_id: Uuid) -> Result<Session, AppError> {
        self.issue_session_with_ttl(user_id, None).await
    }

    async fn issue_session_with_ttl(
        &self,
        user_id: Uuid,
        requested_ttl: Option<Duration>,
    ) -> Result<Session, AppError> {
        let access_token = self.access_tokens.issue_with_ttl(user_id, requested_ttl)?;
        let refresh_token = self.refresh_tokens.issue(user_id).await?;

        Ok(Session {
            access_token,
            refresh_token,
        })
    }

    /// Check a password and open a session
    ///
    /// Unknown identity and wrong password both end in `CredentialMismatch`.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        requested_ttl: Option<Duration>,
    ) -> Result<(Credential, Session), AppError> {
        let email = parse_email(email)?;

        let credential = match self.credentials.find_by_email(&email).await? {
            Some(credential) => credential,
            None => {
                self.hasher.verify_dummy(password);
                return Err(AuthError::CredentialMismatch.into());
            }
        };

        self.hasher.verify(password, &credential.hashed_password)?;

        let session = self
            .issue_session_with_ttl(credential.user_id, requested_ttl)
            .await?;

        tracing::info!(user_id = %credential.user_id, "User logged in");
        Ok((credential, session))
    }

    /// Resolve the user behind an `Authorization: Bearer <access token>` header
    pub fn authenticate_request(&self, header: Option<&str>) -> Result<Uuid, AppError> {
        let token = extract_bearer_token(header)?;
        Ok(self.access_tokens.verify(token)?)
    }

    /// Trade a live refresh token for a new access token
    ///
    /// # Errors
    /// `Unauthorized` if the token is unknown, revoked or expired; no token is issued then
    pub async fn refresh_session(&self, header: Option<&str>) -> Result<RefreshedSession, AppError> {
        let token = extract_bearer_token(header)?;

        let record = match self.refresh_tokens.lookup(token).await {
            Ok(record) => record,
            Err(AppError::RefreshToken(RefreshTokenError::NotFound)) => {
                tracing::warn!("Unknown refresh token presented");
                return Err(AuthError::Unauthorized.into());
            }
            Err(e) => return Err(e),
        };

        if !self.refresh_tokens.is_live(&record) {
            tracing::warn!(
                user_id = %record.user_id,
                revoked = record.revoked_at.is_some(),
                "Dead refresh token presented"
            );
            return Err(AuthError::Unauthorized.into());
        }

        let refresh_token = if self.rotate_refresh_tokens {
            Some(self.rotate(token, record.user_id).await?)
        } else {
            None
        };

        let access_token = self.access_tokens.issue(record.user_id)?;

        tracing::info!(user_id = %record.user_id, rotated = refresh_token.is_some(), "Session refreshed");
        Ok(RefreshedSession {
            user_id: record.user_id,
            access_token,
            refresh_token,
        })
    }

    /// Swap `token` for a freshly persisted one.
    ///
    /// The replacement is stored before the old token is revoked, so a
    /// storage failure leaves the caller holding a live token. If another
    /// caller revoked the old token first, the replacement is revoked too.
    async fn rotate(&self, token: &str, user_id: Uuid) -> Result<String, AppError> {
        let replacement = self.refresh_tokens.issue(user_id).await?;

        let error: AppError = match self.refresh_tokens.revoke(token).await {
            Ok(_) => return Ok(replacement),
            Err(AppError::RefreshToken(_)) => AuthError::Unauthorized.into(),
            Err(e) => e,
        };

        if let Err(e) = self.refresh_tokens.revoke(&replacement).await {
            tracing::error!(user_id = %user_id, error = %e, "Failed to discard replacement refresh token");
        }
        Err(error)
    }

    /// Revoke the refresh token carried in the header
    pub async fn revoke_session(&self, header: Option<&str>) -> Result<(), AppError> {
        let token = extract_bearer_token(header)?;
        self.refresh_tokens.revoke(token).await?;
        Ok(())
    }

    /// Store a new password hash and log the user out of every device.
    ///
    /// Already-issued access tokens stay valid until they expire.
    pub async fn change_password(&self, user_id: Uuid, new_password: &str) -> Result<u64, AppError> {
        let hashed_password = self.hasher.hash(new_password)?;
        self.credentials
            .update_password(user_id, &hashed_password)
            .await?;

        tracing::info!(user_id = %user_id, "Password updated");
        self.refresh_tokens.revoke_all_for_user(user_id).await
    }

    /// Administrative reset of all refresh tokens
    pub async fn reset(&self) -> Result<u64, AppError> {
        self.refresh_tokens.purge().await
    }
}
