/// Middleware module
///
/// Access token enforcement for protected routes.

mod bearer_auth;

pub use bearer_auth::{AuthenticatedUser, RequireAccessToken};
