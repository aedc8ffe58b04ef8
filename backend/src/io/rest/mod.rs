//! # REST API Interface Layer
//!
//! Provides HTTP REST endpoints for the expense tracker.
//! This layer handles:
//! - HTTP request/response serialization and deserialization
//! - Bearer-token authentication of the caller
//! - Error translation from domain to HTTP status codes
//! - Request logging
//!
//! ## Error Mapping
//!
//! | Domain error | Status |
//! |---|---|
//! | validation | 400 |
//! | not signed in, bad credentials | 401 |
//! | someone else's record | 403 |
//! | missing record | 404 |
//! | email already registered | 409 |
//! | storage unavailable | 503 |
//!
//! Error bodies are always `{ "error": "<message>" }`.

pub mod auth_apis;
pub mod error;
pub mod expense_apis;
pub mod mappers;
pub mod session_tokens;
pub mod stats_apis;
pub mod summary_apis;

#[cfg(test)]
pub mod test_support;

use axum::{http::StatusCode, response::Json};
use shared::HealthResponse;

pub use auth_apis::*;
pub use error::ApiError;
pub use expense_apis::*;
pub use session_tokens::{Authenticated, SessionTokens};
pub use stats_apis::*;
pub use summary_apis::*;

pub async fn health() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
        }),
    )
}
