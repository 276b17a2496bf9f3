#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use serde_json::{json, Value as JsonValue};
use storefront_backend::{
    config::{install_config, AppEnvironment, Config, LogFormat},
    database::Database,
    routes, AppState,
};
use tower::ServiceExt;

pub const JWT_SECRET: &str = "test_secret_key";
pub const PASSWORD: &str = "password123";

pub fn test_config() -> Config {
    Config {
        server_address: "127.0.0.1:0".into(),
        database_url: None,
        db_max_connections: 1,
        jwt_secret: JWT_SECRET.into(),
        jwt_ttl_minutes: 60,
        app_env: AppEnvironment::Development,
        seed_demo_data: false,
        log_format: LogFormat::Pretty,
    }
}

/// Router over a fresh in-memory store.
pub fn app() -> Router {
    // Every test in a binary shares the global config; the first one wins.
    let _ = install_config(test_config());
    routes::router(AppState::new(Database::memory(), test_config()))
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> JsonValue {
        serde_json::from_slice(&self.bytes).unwrap_or(JsonValue::Null)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<JsonValue>,
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap().to_vec();
    TestResponse {
        status,
        headers,
        bytes,
    }
}

/// Registers `email` and returns a bearer token for it.
pub async fn login_as(app: &Router, email: &str) -> String {
    let resp = send(
        app,
        "POST",
        "/api/account/register",
        None,
        Some(json!({
            "email": email,
            "user_name": email,
            "password": PASSWORD,
            "first_name": "Test",
            "last_name": "User"
        })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text());

    let resp = send(
        app,
        "POST",
        "/api/account/login",
        None,
        Some(json!({ "email": email, "password": PASSWORD })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text());
    resp.json()["access_token"].as_str().unwrap().to_string()
}

pub async fn create_category(app: &Router, token: &str, name: &str) -> i64 {
    let resp = send(
        app,
        "POST",
        "/api/categories",
        Some(token),
        Some(json!({ "name": name, "description": format!("{} items", name) })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text());
    resp.json()["id"].as_i64().unwrap()
}

pub async fn create_product(app: &Router, token: &str, body: JsonValue) -> TestResponse {
    send(app, "POST", "/api/products", Some(token), Some(body)).await
}
