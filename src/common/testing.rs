// Test harness: in-memory database, fake integrations and a request helper

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower::ServiceExt;

use crate::auth::models::{Claims, SUPABASE_AUDIENCE};
use crate::auth::permissions::permission_strings;
use crate::auth::Role;
use crate::common::config::AppConfig;
use crate::common::dev_mode::DevModeConfig;
use crate::common::migrations::run_migrations;
use crate::common::{new_id, AppState};
use crate::services::fakes::{FakeAiAnalyzer, FakeAuthAdmin, FakeCalendar, FakeEmailSender, FakeStorage};

pub const TEST_JWT_SECRET: &str = "test_jwt_secret";

/// Single-connection in-memory pool with the schema applied
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

/// Supabase style access token for `sub`
pub fn mint_token(secret: &str, sub: &str, exp: usize) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        exp,
        email: None,
        aud: Some(SUPABASE_AUDIENCE.to_string()),
        role: Some("authenticated".to_string()),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub auth_admin: Arc<FakeAuthAdmin>,
    pub email: Arc<FakeEmailSender>,
    pub calendar: Arc<FakeCalendar>,
    pub storage: Arc<FakeStorage>,
    pub ai: Arc<FakeAiAnalyzer>,
}

impl TestApp {
    pub async fn new() -> Self {
        let auth_admin = Arc::new(FakeAuthAdmin::default());
        let email = Arc::new(FakeEmailSender::default());
        let calendar = Arc::new(FakeCalendar::default());
        let storage = Arc::new(FakeStorage::default());
        let ai = Arc::new(FakeAiAnalyzer::default());

        let state = AppState {
            db: test_pool().await,
            config: Arc::new(AppConfig::for_tests()),
            dev_mode: DevModeConfig::disabled(),
            auth_admin: auth_admin.clone(),
            email: email.clone(),
            calendar: calendar.clone(),
            storage: storage.clone(),
            ai: ai.clone(),
        };

        Self {
            router: crate::build_router(state.clone()),
            state,
            auth_admin,
            email,
            calendar,
            storage,
            ai,
        }
    }

    pub fn db(&self) -> &SqlitePool {
        &self.state.db
    }

    pub async fn insert_user(&self, email: &str, role: Role) -> String {
        let id = new_id();
        let permissions = serde_json::to_string(&permission_strings(role)).unwrap();
        sqlx::query(
            "INSERT INTO users (id, email, full_name, role, permissions) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(email)
        .bind(format!("Usuario {}", role.as_str()))
        .bind(role.as_str())
        .bind(permissions)
        .execute(self.db())
        .await
        .unwrap();
        id
    }

    pub fn token_for(&self, user_id: &str) -> String {
        mint_token(TEST_JWT_SECRET, user_id, 9_999_999_999)
    }

    /// Creates a fresh user with `role` and returns a valid token for it
    pub async fn user_token(&self, role: Role) -> String {
        let (_, token) = self.user_with_token(role).await;
        token
    }

    pub async fn user_with_token(&self, role: Role) -> (String, String) {
        let email = format!("{}@hirepro.test", &new_id()[..8]);
        let id = self.insert_user(&email, role).await;
        let token = self.token_for(&id);
        (id, token)
    }

    pub async fn insert_application(&self, title: &str) -> String {
        let id = new_id();
        sqlx::query("INSERT INTO applications (id, title) VALUES (?, ?)")
            .bind(&id)
            .bind(title)
            .execute(self.db())
            .await
            .unwrap();
        id
    }

    pub async fn insert_candidate(&self, full_name: &str, email: &str) -> String {
        let id = new_id();
        sqlx::query("INSERT INTO candidates (id, full_name, email) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(full_name)
            .bind(email)
            .execute(self.db())
            .await
            .unwrap();
        id
    }

    pub async fn insert_postulation(&self, candidate_id: &str, application_id: &str) -> String {
        let id = new_id();
        sqlx::query("INSERT INTO postulations (id, candidate_id, application_id) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(candidate_id)
            .bind(application_id)
            .execute(self.db())
            .await
            .unwrap();
        id
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send_with_headers("GET", uri, token, &[], None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send_with_headers("POST", uri, token, &[], Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send_with_headers("PUT", uri, token, &[], Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send_with_headers("PATCH", uri, token, &[], Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send_with_headers("DELETE", uri, token, &[], None).await
    }

    pub async fn send_with_headers(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        headers: &[(&str, &str)],
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(Method::from_bytes(method.as_bytes()).unwrap())
            .uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.dispatch(request).await
    }

    /// Sends a multipart/form-data body with a single `file` part
    pub async fn upload(
        &self,
        uri: &str,
        token: &str,
        file_name: &str,
        content: &[u8],
    ) -> (StatusCode, Value) {
        let boundary = "hirepro-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                b = boundary,
                f = file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("authorization", format!("Bearer {}", token))
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();
        self.dispatch(request).await
    }

    async fn dispatch(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}
