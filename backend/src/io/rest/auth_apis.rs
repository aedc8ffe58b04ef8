//! # REST API for Authentication
//!
//! Sign-up, log-in and log-out. Successful sign-up and log-in return a
//! bearer token to send as `Authorization: Bearer <token>`.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use tracing::{error, info};

use super::error::ApiError;
use super::session_tokens::Authenticated;
use crate::domain::models::User;
use crate::domain::AuthError;
use crate::AppState;
use shared::{AuthResponse, CredentialsRequest, UserInfo};

fn auth_response(state: &AppState, user: User) -> AuthResponse {
    let token = state.session_tokens.issue(user.clone());
    AuthResponse {
        token,
        user: UserInfo {
            id: user.id.to_string(),
            email: user.email,
        },
    }
}

fn auth_failure(action: &str, e: AuthError) -> axum::response::Response {
    if let AuthError::Unavailable(detail) = &e {
        error!("{} failed: {}", action, detail);
    } else {
        info!("{} rejected: {}", action, e);
    }
    ApiError::from(e).into_response()
}

/// Create an account and sign it in
pub async fn sign_up(State(state): State<AppState>, Json(request): Json<CredentialsRequest>) -> impl IntoResponse {
    info!("POST /api/auth/signup - email: {}", request.email);

    match state.identity_service.sign_up(&request.email, &request.password).await {
        Ok(user) => (StatusCode::CREATED, Json(auth_response(&state, user))).into_response(),
        Err(e) => auth_failure("Sign-up", e),
    }
}

pub async fn log_in(State(state): State<AppState>, Json(request): Json<CredentialsRequest>) -> impl IntoResponse {
    info!("POST /api/auth/login - email: {}", request.email);

    match state.identity_service.log_in(&request.email, &request.password).await {
        Ok(user) => (StatusCode::OK, Json(auth_response(&state, user))).into_response(),
        Err(e) => auth_failure("Log-in", e),
    }
}

/// Revoke the caller's token
pub async fn log_out(State(state): State<AppState>, auth: Authenticated) -> impl IntoResponse {
    info!("POST /api/auth/logout - user: {}", auth.user.id);
    state.session_tokens.revoke(&auth.token);
    StatusCode::NO_CONTENT
}
