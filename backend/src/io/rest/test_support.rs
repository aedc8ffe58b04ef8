//! Helpers for driving the router in handler tests.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use crate::config::AppConfig;
use crate::domain::FixedClock;
use crate::storage::CsvConnection;
use crate::{create_router, AppState};

pub struct TestApp {
    _temp_dir: TempDir,
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    /// Fresh data directory, clock pinned to Wednesday 2025-03-12
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let connection = CsvConnection::new(temp_dir.path()).unwrap();
        let clock = Arc::new(FixedClock(NaiveDate::from_ymd_opt(2025, 3, 12).unwrap()));
        let state = AppState::new(&connection, clock).unwrap();
        let config = AppConfig {
            data_directory: temp_dir.path().to_path_buf(),
            ..AppConfig::default()
        };
        let router = create_router(state.clone(), &config).unwrap();
        Self {
            _temp_dir: temp_dir,
            state,
            router,
        }
    }

    pub async fn raw_request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        self.router.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
    }

    /// Send a request and parse the JSON response body (Null when empty)
    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let response = self.raw_request(method, uri, token, body).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    /// Create an account and return its bearer token
    pub async fn sign_up(&self, email: &str) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/signup",
                None,
                Some(json!({"email": email, "password": "hunter22"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["token"].as_str().unwrap().to_string()
    }
}
