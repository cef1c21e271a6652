//! Caller session extraction.
//!
//! The service never mints sessions itself; it forwards the caller's
//! bearer token to the identity provider, which is the source of truth
//! for session validity.

use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};

/// Extract the session bearer token or reject the request.
///
/// # Errors
/// `401 Unauthorized` when the header is missing, malformed, or empty.
pub(crate) fn require_bearer(headers: &HeaderMap) -> Result<String, StatusCode> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or(StatusCode::UNAUTHORIZED)
}

#[cfg(test)]
mod tests {
    use super::require_bearer;
    use axum::http::{HeaderMap, HeaderValue, StatusCode};

    #[test]
    fn accepts_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc123"));
        assert_eq!(require_bearer(&headers), Ok("abc123".to_string()));
    }

    #[test]
    fn rejects_missing_header() {
        assert_eq!(
            require_bearer(&HeaderMap::new()),
            Err(StatusCode::UNAUTHORIZED)
        );
    }

    #[test]
    fn rejects_non_bearer_schemes_and_empty_tokens() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic abc123"));
        assert_eq!(require_bearer(&headers), Err(StatusCode::UNAUTHORIZED));

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer   "));
        assert_eq!(require_bearer(&headers), Err(StatusCode::UNAUTHORIZED));
    }
}
