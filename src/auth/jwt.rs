/// Access Token Issuing and Verification
///
/// HS256 JWTs over `Claims`. Expiry is checked against an injected clock
/// instead of the library's wall-clock check so tests can move time.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::claims::{Claims, ACCESS_TOKEN_ISSUER};
use crate::clock::Clock;
use crate::configuration::AuthSettings;
use crate::error::{AppError, AuthError};

/// Sign a new access token for `user_id`, valid for `ttl` from `now`
///
/// # Errors
/// Returns an internal error if the token cannot be encoded
pub fn issue_access_token(
    user_id: Uuid,
    secret: &[u8],
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<String, AppError> {
    let claims = Claims::new(user_id, now, ttl);

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Verify an access token and return the user it was issued to
///
/// # Errors
/// - `TokenMalformed` if the token cannot be parsed
/// - `SignatureInvalid` if the MAC, algorithm or issuer do not match
/// - `TokenExpired` if `now` is past the token's expiry
pub fn verify_access_token(
    token: &str,
    secret: &[u8],
    now: DateTime<Utc>,
) -> Result<Uuid, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ACCESS_TOKEN_ISSUER]);
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);
    // Expiry is judged below against the injected clock
    validation.validate_exp = false;

    let claims = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            let err = match e.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidIssuer
                | ErrorKind::InvalidAlgorithm => AuthError::SignatureInvalid,
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenMalformed,
            };
            tracing::warn!(error = %e, "Access token rejected");
            err
        })?;

    if claims.is_expired_at(now) {
        tracing::debug!(user_id = %claims.sub, "Access token expired");
        return Err(AuthError::TokenExpired);
    }

    claims.user_id()
}

/// Access token issuer bound to one secret and one clock
#[derive(Clone)]
pub struct AccessTokenCodec {
    secret: Vec<u8>,
    default_ttl: Duration,
    max_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl AccessTokenCodec {
    pub fn new(
        secret: impl Into<Vec<u8>>,
        default_ttl: Duration,
        max_ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            secret: secret.into(),
            default_ttl,
            max_ttl,
            clock,
        }
    }

    pub fn from_settings(settings: &AuthSettings, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            settings.signing_secret.as_bytes(),
            Duration::seconds(settings.access_token_ttl_seconds),
            Duration::seconds(settings.max_access_token_ttl_seconds),
            clock,
        )
    }

    /// Lifetime actually granted for a client request.
    ///
    /// A positive request no longer than the maximum is honoured; anything
    /// else gets the default.
    pub fn effective_ttl(&self, requested: Option<Duration>) -> Duration {
        match requested {
            Some(ttl) if ttl > Duration::zero() && ttl <= self.max_ttl => ttl,
            _ => self.default_ttl,
        }
    }

    pub fn issue(&self, user_id: Uuid) -> Result<String, AppError> {
        self.issue_with_ttl(user_id, None)
    }

    pub fn issue_with_ttl(
        &self,
        user_id: Uuid,
        requested: Option<Duration>,
    ) -> Result<String, AppError> {
        issue_access_token(
            user_id,
            &self.secret,
            self.effective_ttl(requested),
            self.clock.now(),
        )
    }

    pub fn verify(&self, token: &str) -> Result<Uuid, AuthError> {
        verify_access_token(token, &self.secret, self.clock.now())
    }
}
