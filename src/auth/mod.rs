/// Authentication module
///
/// Password hashing, access token issuing/verification, refresh token
/// lifecycle, bearer header parsing and the session facade built on them.

mod bearer;
mod claims;
mod jwt;
mod password;
mod refresh_token;
mod session;

pub use bearer::{authorization_header, extract_bearer_token};
pub use claims::{Claims, ACCESS_TOKEN_ISSUER};
pub use jwt::{issue_access_token, verify_access_token, AccessTokenCodec};
pub use password::PasswordHasher;
pub use refresh_token::{generate_refresh_token, hash_token, RefreshTokenStore};
pub use session::{RefreshedSession, Session, SessionService};
