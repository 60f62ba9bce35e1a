// Unraid BFF — CSRF double-submit
//
// Every response hands out a random token cookie when the request had none.
// Unsafe methods must echo that cookie in the `x-csrf-token` header.

use axum::extract::Request;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

use super::error::ErrorBody;

pub const CSRF_COOKIE: &str = "unpwa_csrf";
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Value of cookie `name` across all `Cookie` headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn is_forwarded_https(headers: &HeaderMap) -> bool {
    headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|proto| proto == "https")
}

fn token_cookie(secure: bool) -> String {
    format!(
        "{}={}; Path=/; SameSite=Lax{}",
        CSRF_COOKIE,
        Uuid::new_v4(),
        if secure { "; Secure" } else { "" }
    )
}

/// Attach a fresh token cookie to the response when the request carried none.
pub async fn issue_token(request: Request, next: Next) -> Response {
    let has_token = cookie_value(request.headers(), CSRF_COOKIE).is_some();
    let secure = is_forwarded_https(request.headers());

    let mut response = next.run(request).await;
    if !has_token {
        if let Ok(cookie) = HeaderValue::from_str(&token_cookie(secure)) {
            response.headers_mut().append(SET_COOKIE, cookie);
        }
    }
    response
}

fn is_safe(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Reject unsafe requests whose header token does not match the cookie.
pub async fn require_token(request: Request, next: Next) -> Response {
    if is_safe(request.method()) {
        return next.run(request).await;
    }

    let cookie = cookie_value(request.headers(), CSRF_COOKIE);
    let header = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok());
    let valid = matches!((cookie.as_deref(), header), (Some(cookie), Some(header)) if cookie == header);

    if valid {
        return next.run(request).await;
    }
    tracing::warn!(method = %request.method(), path = %request.uri().path(), "CSRF validation failed");
    (
        StatusCode::FORBIDDEN,
        Json(ErrorBody {
            error: "CSRF validation failed.".to_string(),
            detail: None,
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_value_parsing() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark; unpwa_csrf=abc-123"));
        headers.append(COOKIE, HeaderValue::from_static("other=1"));
        assert_eq!(cookie_value(&headers, CSRF_COOKIE).as_deref(), Some("abc-123"));
        assert!(cookie_value(&headers, "missing").is_none());

        let mut empty = HeaderMap::new();
        empty.insert(COOKIE, HeaderValue::from_static("unpwa_csrf="));
        assert!(cookie_value(&empty, CSRF_COOKIE).is_none());
    }

    #[test]
    fn test_token_cookie_attributes() {
        let plain = token_cookie(false);
        assert!(plain.starts_with("unpwa_csrf="));
        assert!(plain.contains("Path=/"));
        assert!(plain.contains("SameSite=Lax"));
        assert!(!plain.contains("Secure"));
        assert!(!plain.contains("HttpOnly"), "the PWA reads the token from script");

        assert!(token_cookie(true).ends_with("; Secure"));
    }

    #[test]
    fn test_forwarded_https() {
        let mut headers = HeaderMap::new();
        assert!(!is_forwarded_https(&headers));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        assert!(is_forwarded_https(&headers));
    }
}
