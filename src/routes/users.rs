/// User credential routes
///
/// Only the password half of the user record is handled here; the rest of
/// the user resource belongs to the user service.

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::auth::SessionService;
use crate::error::AppError;
use crate::middleware::AuthenticatedUser;

#[derive(Deserialize)]
pub struct UpdatePasswordRequest {
    pub password: String,
}

/// PUT /api/users
///
/// **Requires a valid access token** (checked by `RequireAccessToken`).
/// Every refresh token of the user is revoked afterwards.
///
/// # Errors
/// - 400: Empty or over-long password
/// - 401: Missing, malformed, expired or forged access token
/// - 404: The token's user no longer exists
pub async fn update_password(
    user: web::ReqData<AuthenticatedUser>,
    form: web::Json<UpdatePasswordRequest>,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let AuthenticatedUser(user_id) = user.into_inner();

    sessions.change_password(user_id, &form.password).await?;

    Ok(HttpResponse::NoContent().finish())
}
