/// Access token claims
///
/// Registered JWT claims (RFC 7519) only. The issuer doubles as the token
/// purpose so a token minted for anything else is never accepted as access.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;

/// Issuer stamped on every access token
pub const ACCESS_TOKEN_ISSUER: &str = "chirpy-access";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    pub iss: String,
}

impl Claims {
    pub fn new(user_id: Uuid, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub: user_id.to_string(),
            exp: (issued_at + ttl).timestamp(),
            iat: issued_at.timestamp(),
            iss: ACCESS_TOKEN_ISSUER.to_string(),
        }
    }

    /// Extract user ID from claims
    ///
    /// # Errors
    /// `TokenMalformed` if the subject is not a UUID
    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::TokenMalformed)
    }

    /// Expired once `now` is strictly past `exp`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() > self.exp
    }
}
