/// Error Handling Module
///
/// Every failure in the session core is a distinguishable value:
/// 1. Domain-specific error types (input, auth, refresh-token state, storage, config)
/// 2. A unified `AppError` used for control flow
/// 3. HTTP response mapping with structured logging

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Caller supplied empty or malformed input. No side effect has happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingHeader,
    MalformedHeader,
    EmptyToken,
    EmptyField(String),
    TooLong(String, usize),
    InvalidFormat(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingHeader => write!(f, "no authorization header included in request"),
            ValidationError::MalformedHeader => write!(f, "malformed authorization header"),
            ValidationError::EmptyToken => write!(f, "empty bearer token"),
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} bytes)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
        }
    }
}

impl StdError for ValidationError {}

/// Authentication and authorization errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Password did not match. Deliberately says nothing about whether the identity exists.
    CredentialMismatch,
    TokenMalformed,
    SignatureInvalid,
    TokenExpired,
    /// Refresh token unknown, expired or revoked.
    Unauthorized,
    Forbidden(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::CredentialMismatch => write!(f, "Incorrect email or password"),
            AuthError::TokenMalformed => write!(f, "Token is malformed"),
            AuthError::SignatureInvalid => write!(f, "Token signature is invalid"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::Unauthorized => write!(f, "Refresh token is not valid"),
            AuthError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
        }
    }
}

impl StdError for AuthError {}

/// Refresh token state errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshTokenError {
    NotFound,
    AlreadyRevoked,
    AlreadyExpired,
}

impl fmt::Display for RefreshTokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshTokenError::NotFound => write!(f, "refresh token not found"),
            RefreshTokenError::AlreadyRevoked => write!(f, "refresh token has already been revoked"),
            RefreshTokenError::AlreadyExpired => write!(f, "refresh token has already expired"),
        }
    }
}

impl StdError for RefreshTokenError {}

/// Persistence errors from the external stores
#[derive(Debug)]
pub enum DatabaseError {
    NotFound(String),
    QueryExecution(String),
    ConnectionPool(String),
    UnexpectedError(String),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::NotFound(msg) => write!(f, "Not found: {}", msg),
            DatabaseError::QueryExecution(msg) => write!(f, "Query error: {}", msg),
            DatabaseError::ConnectionPool(msg) => write!(f, "Database connection error: {}", msg),
            DatabaseError::UnexpectedError(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl StdError for DatabaseError {}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    MissingRequired(String),
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingRequired(msg) => write!(f, "Missing required config: {}", msg),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config value: {}", msg),
        }
    }
}

impl StdError for ConfigError {}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Auth(AuthError),
    RefreshToken(RefreshTokenError),
    Database(DatabaseError),
    Config(ConfigError),
    Hashing(String),
    Internal(String),
}

impl AppError {
    /// True for faults on our side (store down, hashing broken, misconfiguration).
    pub fn is_server_fault(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Config(_) | AppError::Hashing(_) | AppError::Internal(_)
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::RefreshToken(e) => write!(f, "{}", e),
            AppError::Database(e) => write!(f, "{}", e),
            AppError::Config(e) => write!(f, "{}", e),
            AppError::Hashing(msg) => write!(f, "Password hashing failed: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

// ============================================================================
// FROM IMPLEMENTATIONS
// ============================================================================

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<RefreshTokenError> for AppError {
    fn from(err: RefreshTokenError) -> Self {
        AppError::RefreshToken(err)
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::Database(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => {
                AppError::Database(DatabaseError::NotFound("Record not found".to_string()))
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::Database(DatabaseError::ConnectionPool(err.to_string()))
            }
            sqlx::Error::Database(db_err) => {
                AppError::Database(DatabaseError::QueryExecution(db_err.to_string()))
            }
            other => AppError::Database(DatabaseError::UnexpectedError(other.to_string())),
        }
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error response body
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for correlating the response with the log line
    pub error_id: String,
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    pub status: u16,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(e) => match e {
                ValidationError::MissingHeader => (StatusCode::UNAUTHORIZED, "MISSING_TOKEN"),
                ValidationError::MalformedHeader => (StatusCode::UNAUTHORIZED, "MALFORMED_HEADER"),
                ValidationError::EmptyToken => (StatusCode::UNAUTHORIZED, "EMPTY_TOKEN"),
                _ => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            },
            AppError::Auth(e) => match e {
                AuthError::CredentialMismatch => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
                AuthError::TokenMalformed => (StatusCode::UNAUTHORIZED, "TOKEN_MALFORMED"),
                AuthError::SignatureInvalid => (StatusCode::UNAUTHORIZED, "SIGNATURE_INVALID"),
                AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED"),
                AuthError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
                AuthError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            },
            AppError::RefreshToken(e) => match e {
                RefreshTokenError::NotFound => (StatusCode::UNAUTHORIZED, "REFRESH_TOKEN_NOT_FOUND"),
                RefreshTokenError::AlreadyRevoked => {
                    (StatusCode::UNAUTHORIZED, "REFRESH_TOKEN_REVOKED")
                }
                RefreshTokenError::AlreadyExpired => {
                    (StatusCode::UNAUTHORIZED, "REFRESH_TOKEN_EXPIRED")
                }
            },
            AppError::Database(e) => match e {
                DatabaseError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                DatabaseError::ConnectionPool(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            },
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            AppError::Hashing(_) => (StatusCode::INTERNAL_SERVER_ERROR, "HASHING_ERROR"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (status, code) = self.status_and_code();

        // Server faults never echo their internals to the client
        let message = if self.is_server_fault() {
            match self {
                AppError::Database(DatabaseError::NotFound(_)) => self.to_string(),
                AppError::Database(DatabaseError::ConnectionPool(_)) => {
                    "Database service temporarily unavailable".to_string()
                }
                _ => "Internal server error".to_string(),
            }
        } else {
            self.to_string()
        };

        let error_response =
            ErrorResponse::new(request_id.to_string(), message, code.to_string(), status.as_u16());

        (status, error_response)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Validation error");
            }
            AppError::Auth(AuthError::CredentialMismatch) => {
                tracing::warn!(request_id = request_id, error = %self, "Invalid credentials attempt");
            }
            AppError::Auth(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Authentication error");
            }
            AppError::RefreshToken(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Refresh token state error");
            }
            AppError::Database(e) => {
                tracing::error!(request_id = request_id, error = %e, "Database error");
            }
            AppError::Config(e) => {
                tracing::error!(request_id = request_id, error = %e, "Configuration error");
            }
            AppError::Hashing(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Password hashing error");
            }
            AppError::Internal(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Internal error");
            }
        }
    }
}

/// Implement ResponseError for Actix-web integration
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&request_id);

        let (status, error_response) = <Self as ErrorHandler>::error_response(self, &request_id);

        HttpResponse::build(status).json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        self.status_and_code().0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::EmptyField("email".to_string());
        assert_eq!(err.to_string(), "email is empty");
    }

    #[test]
    fn test_refresh_token_error_conversion() {
        let app_err: AppError = RefreshTokenError::AlreadyRevoked.into();
        match app_err {
            AppError::RefreshToken(RefreshTokenError::AlreadyRevoked) => (),
            _ => panic!("Expected RefreshToken error"),
        }
    }

    #[test]
    fn test_token_errors_map_to_distinct_codes() {
        let expired = AppError::Auth(AuthError::TokenExpired);
        let forged = AppError::Auth(AuthError::SignatureInvalid);

        let (status_a, body_a) = ErrorHandler::error_response(&expired, "req-1");
        let (status_b, body_b) = ErrorHandler::error_response(&forged, "req-2");

        assert_eq!(status_a, StatusCode::UNAUTHORIZED);
        assert_eq!(status_b, StatusCode::UNAUTHORIZED);
        assert_eq!(body_a.code, "TOKEN_EXPIRED");
        assert_eq!(body_b.code, "SIGNATURE_INVALID");
    }

    #[test]
    fn test_server_faults_hide_details() {
        let err = AppError::Database(DatabaseError::QueryExecution(
            "relation refresh_tokens does not exist".to_string(),
        ));
        let (status, body) = ErrorHandler::error_response(&err, "req-3");

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.message, "Internal server error");
        assert!(err.is_server_fault());
    }

    #[test]
    fn test_credential_mismatch_does_not_mention_identity() {
        let err = AppError::Auth(AuthError::CredentialMismatch);
        let (_, body) = ErrorHandler::error_response(&err, "req-4");

        assert_eq!(body.message, "Incorrect email or password");
        assert!(!err.is_server_fault());
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::Database(DatabaseError::NotFound(_))));
    }
}
