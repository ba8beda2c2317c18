//! Cookie and header parsing for credentials.

use axum::http::{HeaderMap, header};

/// Cookie name for the access token.
pub const ACCESS_COOKIE_NAME: &str = "access_token";

/// Cookie name for the refresh token.
pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                let value = value.trim();
                return (!value.is_empty()).then_some(value);
            }
        }
    }
    None
}

/// Extract a bearer token from the Authorization header.
pub fn get_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// The access token for a request: cookie first, then the Authorization header.
pub fn access_credential(headers: &HeaderMap) -> Option<&str> {
    get_cookie(headers, ACCESS_COOKIE_NAME).or_else(|| get_bearer_token(headers))
}

/// Build a Set-Cookie value for a token.
pub fn token_cookie(name: &str, value: &str, max_age: u64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}{}",
        name, value, max_age, secure
    )
}

/// Build a Set-Cookie value that removes a cookie.
pub fn clear_cookie(name: &str, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0{}",
        name, secure
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_get_cookie_simple() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("access_token=abc123"),
        );

        assert_eq!(get_cookie(&headers, "access_token"), Some("abc123"));
    }

    #[test]
    fn test_get_cookie_multiple() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("foo=bar; access_token=abc123; refresh_token=xyz789"),
        );

        assert_eq!(get_cookie(&headers, "access_token"), Some("abc123"));
        assert_eq!(get_cookie(&headers, "refresh_token"), Some("xyz789"));
        assert_eq!(get_cookie(&headers, "foo"), Some("bar"));
    }

    #[test]
    fn test_get_cookie_not_found() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("foo=bar"));

        assert_eq!(get_cookie(&headers, "access_token"), None);
    }

    #[test]
    fn test_get_cookie_empty_value() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("access_token="));

        assert_eq!(get_cookie(&headers, "access_token"), None);
    }

    #[test]
    fn test_get_cookie_with_spaces() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("  access_token = abc123  ; foo=bar"),
        );

        assert_eq!(get_cookie(&headers, "access_token"), Some("abc123"));
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );
        assert_eq!(get_bearer_token(&headers), Some("abc.def.ghi"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic Zm9v"));
        assert_eq!(get_bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(get_bearer_token(&headers), None);
    }

    #[test]
    fn test_access_credential_prefers_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer from-header"),
        );
        assert_eq!(access_credential(&headers), Some("from-header"));

        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("access_token=from-cookie"),
        );
        assert_eq!(access_credential(&headers), Some("from-cookie"));
    }

    #[test]
    fn test_cookie_builders() {
        assert_eq!(
            token_cookie(ACCESS_COOKIE_NAME, "abc", 300, true),
            "access_token=abc; HttpOnly; SameSite=Strict; Path=/; Max-Age=300; Secure"
        );
        assert_eq!(
            clear_cookie(REFRESH_COOKIE_NAME, false),
            "refresh_token=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0"
        );
    }
}
