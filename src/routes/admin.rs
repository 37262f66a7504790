use actix_web::{web, HttpResponse};

use crate::auth::SessionService;
use crate::configuration::ApplicationSettings;
use crate::error::{AppError, AuthError};

/// POST /admin/reset
///
/// Deletes every refresh token. Only available on the `dev` platform.
pub async fn reset(
    application: web::Data<ApplicationSettings>,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    if !application.is_dev() {
        return Err(AuthError::Forbidden("reset attempted in non-dev environment".to_string()).into());
    }

    let deleted = sessions.reset().await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "deleted_refresh_tokens": deleted })))
}
