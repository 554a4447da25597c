//! Authentication middleware for the REST API
//!
//! Active only in `unprivate` mode: every route except `/api/health` must
//! present a configured API key, either in the `X-Api-Key` header or as an
//! `?api_key=` query parameter. Missing keys get 401, rejected keys 403.

use crate::error::Error;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Routes reachable without a key in every mode
const EXEMPT_PATHS: &[&str] = &["/api/health"];

/// Middleware enforcing the configured API keylist
///
/// The keylist is the middleware state; the router only installs this
/// layer when the configured mode demands keys, so an empty list here
/// rejects everything (the server refuses to start that way).
pub async fn require_api_key(
    State(keys): State<Vec<String>>,
    request: Request,
    next: Next,
) -> Response {
    if EXEMPT_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let Some(provided) = extract_key(&request) else {
        return Error::AuthRequired.into_response();
    };

    // Constant-time comparison against every configured key, so response
    // timing leaks neither key content nor list position.
    let mut authorized = false;
    for key in &keys {
        if constant_time_eq(provided.as_bytes(), key.as_bytes()) {
            authorized = true;
        }
    }

    if authorized {
        next.run(request).await
    } else {
        Error::AuthRejected.into_response()
    }
}

/// Pull the API key from the `X-Api-Key` header or the `api_key` query parameter
fn extract_key(request: &Request) -> Option<String> {
    if let Some(value) = request.headers().get("x-api-key")
        && let Ok(header_key) = value.to_str()
        && !header_key.trim().is_empty()
    {
        return Some(header_key.trim().to_string());
    }

    let query = request.uri().query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == "api_key")
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Constant-time byte comparison to prevent timing side-channel attacks.
/// Always compares all bytes regardless of where the first mismatch occurs.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        middleware,
        routing::get,
    };
    use tower::ServiceExt; // for oneshot

    async fn test_handler() -> impl IntoResponse {
        (StatusCode::OK, "Success")
    }

    fn keyed_app(keys: Vec<&str>) -> Router {
        let keys: Vec<String> = keys.into_iter().map(String::from).collect();
        Router::new()
            .route("/api/download", get(test_handler))
            .route("/api/health", get(test_handler))
            .layer(middleware::from_fn_with_state(keys, require_api_key))
    }

    #[tokio::test]
    async fn missing_key_is_401() {
        let request = Request::builder()
            .uri("/api/download")
            .body(Body::empty())
            .unwrap();

        let response = keyed_app(vec!["secret"]).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body_str = String::from_utf8(body.to_vec()).unwrap();
        assert!(body_str.contains("auth_required"));
    }

    #[tokio::test]
    async fn wrong_key_is_403() {
        let request = Request::builder()
            .uri("/api/download")
            .header("X-Api-Key", "not-it")
            .body(Body::empty())
            .unwrap();

        let response = keyed_app(vec!["secret"]).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn valid_header_key_passes() {
        let request = Request::builder()
            .uri("/api/download")
            .header("X-Api-Key", "secret")
            .body(Body::empty())
            .unwrap();

        let response = keyed_app(vec!["secret"]).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn valid_query_key_passes() {
        let request = Request::builder()
            .uri("/api/download?api_key=secret")
            .body(Body::empty())
            .unwrap();

        let response = keyed_app(vec!["secret"]).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn any_key_in_the_list_is_accepted() {
        let request = Request::builder()
            .uri("/api/download")
            .header("X-Api-Key", "second")
            .body(Body::empty())
            .unwrap();

        let response = keyed_app(vec!["first", "second"])
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_is_exempt() {
        let request = Request::builder()
            .uri("/api/health")
            .body(Body::empty())
            .unwrap();

        let response = keyed_app(vec!["secret"]).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn keys_are_case_sensitive() {
        let request = Request::builder()
            .uri("/api/download")
            .header("X-Api-Key", "SECRET")
            .body(Body::empty())
            .unwrap();

        let response = keyed_app(vec!["secret"]).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn constant_time_eq_compares_exact_bytes() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"", b""));
    }
}
