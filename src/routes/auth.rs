/// Session Routes
///
/// Login, refresh and revoke. Refresh and revoke read the refresh token from
/// `Authorization: Bearer <refresh token>`.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::auth::{authorization_header, SessionService};
use crate::error::AppError;

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Optional shorter access token lifetime
    pub expires_in_seconds: Option<i64>,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub id: String,
    pub email: String,
    pub token: String,
    pub refresh_token: String,
    pub token_type: String,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// POST /api/login
///
/// # Errors
/// - 400: Malformed email
/// - 401: Unknown email or wrong password (same response for both)
/// - 500/503: Hashing or store failure
pub async fn login(
    form: web::Json<LoginRequest>,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let requested_ttl = form.expires_in_seconds.map(Duration::seconds);

    let (credential, session) = sessions
        .login(&form.email, &form.password, requested_ttl)
        .await?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        id: credential.user_id.to_string(),
        email: credential.email,
        token: session.access_token,
        refresh_token: session.refresh_token,
        token_type: "Bearer".to_string(),
    }))
}

/// POST /api/refresh
///
/// # Errors
/// - 401: Missing/malformed header, or unknown, revoked or expired refresh token
pub async fn refresh(
    req: HttpRequest,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let refreshed = sessions
        .refresh_session(authorization_header(&req)?)
        .await?;

    Ok(HttpResponse::Ok().json(RefreshResponse {
        token: refreshed.access_token,
        refresh_token: refreshed.refresh_token,
    }))
}

/// POST /api/revoke
///
/// # Errors
/// - 401: Missing/malformed header, unknown, already revoked or already expired token
pub async fn revoke(
    req: HttpRequest,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    sessions.revoke_session(authorization_header(&req)?).await?;
    Ok(HttpResponse::NoContent().finish())
}
