/// Bearer scheme parsing for the `Authorization` header.
///
/// Only the scheme at the very start is structural: everything after the
/// first `"Bearer "` is handed back untouched.

use actix_web::http::header::AUTHORIZATION;
use actix_web::HttpRequest;

use crate::error::ValidationError;

const BEARER_PREFIX: &str = "Bearer ";

/// Pull the raw token out of an `Authorization` header value
pub fn extract_bearer_token(header: Option<&str>) -> Result<&str, ValidationError> {
    let header = match header {
        Some(value) if !value.is_empty() => value,
        _ => return Err(ValidationError::MissingHeader),
    };

    let token = header
        .strip_prefix(BEARER_PREFIX)
        .ok_or(ValidationError::MalformedHeader)?;

    if token.is_empty() {
        return Err(ValidationError::EmptyToken);
    }

    Ok(token)
}

/// The request's raw `Authorization` header value, if any.
///
/// A value that is not valid UTF-8 is `MalformedHeader`.
pub fn authorization_header(req: &HttpRequest) -> Result<Option<&str>, ValidationError> {
    match req.headers().get(AUTHORIZATION) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(Some)
            .map_err(|_| ValidationError::MalformedHeader),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_valid_bearer_token() {
        assert_eq!(extract_bearer_token(Some("Bearer abc")), Ok("abc"));
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(extract_bearer_token(None), Err(ValidationError::MissingHeader));
        assert_eq!(extract_bearer_token(Some("")), Err(ValidationError::MissingHeader));
    }

    #[test]
    fn test_no_space_after_scheme() {
        assert_eq!(
            extract_bearer_token(Some("Bearerabc")),
            Err(ValidationError::MalformedHeader)
        );
        assert_eq!(
            extract_bearer_token(Some("Bearer")),
            Err(ValidationError::MalformedHeader)
        );
    }

    #[test]
    fn test_wrong_scheme() {
        for header in ["token_string", "Bear token_string", "bearer token_string", "Basic abc"] {
            assert_eq!(
                extract_bearer_token(Some(header)),
                Err(ValidationError::MalformedHeader),
                "header: {}",
                header
            );
        }
    }

    #[test]
    fn test_empty_token() {
        assert_eq!(extract_bearer_token(Some("Bearer ")), Err(ValidationError::EmptyToken));
    }

    #[test]
    fn test_only_first_prefix_stripped() {
        assert_eq!(extract_bearer_token(Some("Bearer a Bearer b")), Ok("a Bearer b"));
        assert_eq!(extract_bearer_token(Some("Bearer  padded ")), Ok(" padded "));
    }

    #[test]
    fn test_header_from_request() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer token_string"))
            .to_http_request();

        let header = authorization_header(&req).unwrap();

        assert_eq!(extract_bearer_token(header), Ok("token_string"));
    }

    #[test]
    fn test_request_without_header() {
        let req = TestRequest::default().to_http_request();
        let header = authorization_header(&req).unwrap();

        assert_eq!(extract_bearer_token(header), Err(ValidationError::MissingHeader));
    }

    #[test]
    fn test_non_utf8_header() {
        let value = actix_web::http::header::HeaderValue::from_bytes(b"Bearer \xff\xfe").unwrap();
        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, value))
            .to_http_request();

        assert_eq!(authorization_header(&req), Err(ValidationError::MalformedHeader));
    }
}
