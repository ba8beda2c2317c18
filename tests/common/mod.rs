#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use sessiongate::{ServerConfig, create_app, db::Database, jwt::TokenConfig};
use tower::ServiceExt;

pub const ACCESS_SECRET: &[u8] = b"test-access-secret-0123456789abcdef";
pub const REFRESH_SECRET: &[u8] = b"test-refresh-secret-0123456789abcdef";
pub const PASSWORD: &str = "correct-horse-battery";

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    /// Subject id of the seeded user "alice"
    pub alice: String,
}

pub fn token_config() -> TokenConfig {
    TokenConfig {
        access_secret: ACCESS_SECRET.to_vec(),
        refresh_secret: REFRESH_SECRET.to_vec(),
        access_ttl: 300,
        refresh_ttl: 3600,
    }
}

/// App over an in-memory database with one user, alice.
pub async fn test_app() -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let alice = db
        .create_user("alice", "alice@example.com", PASSWORD)
        .await
        .expect("Failed to create user");

    let config = ServerConfig {
        db: db.clone(),
        tokens: token_config(),
        secure_cookies: false,
    };

    TestApp {
        app: create_app(&config),
        db,
        alice,
    }
}

pub async fn post_json(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
    cookie: Option<&str>,
) -> Response<Body> {
    post_raw(app, uri, &body.to_string(), cookie).await
}

/// POST a JSON content type with an arbitrary body.
pub async fn post_raw(app: &Router, uri: &str, body: &str, cookie: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }

    app.clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

pub async fn post_empty(app: &Router, uri: &str, header: Option<(&str, String)>) -> Response<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some((name, value)) = header {
        builder = builder.header(name, value);
    }

    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// GET with an optional (header name, value) pair.
pub async fn get(app: &Router, uri: &str, header: Option<(&str, String)>) -> Response<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some((name, value)) = header {
        builder = builder.header(name, value);
    }

    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Extract Set-Cookie headers from response
pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

/// Check if cookies contain a token being cleared (Max-Age=0)
pub fn has_cleared_cookie(cookies: &[String], cookie_name: &str) -> bool {
    cookies
        .iter()
        .any(|c| c.starts_with(&format!("{}=", cookie_name)) && c.contains("Max-Age=0"))
}

/// Value of a cookie set in the response, if any.
pub fn cookie_value(cookies: &[String], cookie_name: &str) -> Option<String> {
    let prefix = format!("{}=", cookie_name);
    cookies
        .iter()
        .find_map(|c| c.strip_prefix(prefix.as_str()))
        .and_then(|rest| rest.split(';').next())
        .map(|value| value.to_string())
}

/// Log alice in and return (access_token, refresh_token).
pub async fn login_alice(app: &Router) -> (String, String) {
    let response = post_json(
        app,
        "/api/v1/users/login",
        serde_json::json!({ "username": "alice", "password": PASSWORD }),
        None,
    )
    .await;
    assert_eq!(response.status(), 200);

    let body = body_json(response).await;
    (
        body["access_token"].as_str().unwrap().to_string(),
        body["refresh_token"].as_str().unwrap().to_string(),
    )
}
