use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::config::{AppConfig, AuthConfig, DatabaseConfig, LimitsConfig, ServerConfig};
use crate::state::AppState;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const USER_PASSWORD: &str = "reader-password";

/// A router over a fresh database. The temp dir must outlive the pool.
pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    _dir: TempDir,
}

pub fn test_config(db_url: String) -> AppConfig {
    AppConfig {
        server: ServerConfig { host: "127.0.0.1".to_string(), port: 8080, trust_proxy_headers: false },
        database: DatabaseConfig { url: db_url, max_connections: 4 },
        auth: AuthConfig {
            jwt_secret: "integration-test-secret-0123456789abcdef".to_string(),
            token_ttl_hours: 1,
            bcrypt_cost: 4,
            admin_username: Some(ADMIN_USERNAME.to_string()),
            admin_password: Some(ADMIN_PASSWORD.to_string()),
        },
        limits: LimitsConfig { max_body_bytes: 64 * 1024, login_per_minute: 1000, register_per_minute: 1000 },
        security: None,
    }
}

pub async fn setup_db() -> (sqlx::SqlitePool, TempDir) {
    let dir = TempDir::new().unwrap();
    let db_url = format!("sqlite://{}/test.db", dir.path().display());
    let pool = crate::db::connect(&DatabaseConfig { url: db_url, max_connections: 4 }).await.unwrap();
    crate::db::init_db(&pool).await.unwrap();
    (pool, dir)
}

pub async fn setup_with(tweak: impl FnOnce(&mut AppConfig)) -> TestApp {
    let (pool, dir) = setup_db().await;
    let mut config = test_config(format!("sqlite://{}/test.db", dir.path().display()));
    tweak(&mut config);
    let state = AppState::new(pool, config);
    crate::auth::ensure_admin(&state).await.unwrap();
    TestApp { app: crate::routes::router(state.clone()), state, _dir: dir }
}

pub async fn setup() -> TestApp {
    setup_with(|_| {}).await
}

impl TestApp {
    /// Sends a request and returns the status and the body parsed as JSON
    /// (non-JSON bodies come back as a JSON string).
    pub async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        self.send_with_headers(method, uri, token, body, &[]).await
    }

    pub async fn send_with_headers(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
        headers: &[(&str, String)],
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, value.as_str());
        }
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, token, None).await
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) =
            self.post("/auth/login", None, json!({ "username": username, "password": password })).await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_USERNAME, ADMIN_PASSWORD).await
    }

    /// Registers `username` and returns `(token, user id)`.
    pub async fn register_user(&self, username: &str) -> (String, String) {
        let (status, body) =
            self.post("/auth/register", None, json!({ "username": username, "password": USER_PASSWORD })).await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        let id = body["data"]["id"].as_str().unwrap().to_string();
        (self.login(username, USER_PASSWORD).await, id)
    }

    /// Creates a book through the API and returns its id.
    pub async fn create_book(&self, token: &str, title: &str, author: &str) -> String {
        let (status, body) = self
            .post(
                "/books",
                Some(token),
                json!({ "title": title, "author": author, "topic": "Fiction", "language": "English" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create book failed: {}", body);
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

pub fn error_message(body: &Value) -> &str {
    body["error"]["message"].as_str().unwrap_or_default()
}

pub fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}
