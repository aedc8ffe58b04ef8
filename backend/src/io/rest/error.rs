//! Translation of domain errors into HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use shared::ErrorResponse;

use crate::domain::models::ValidationError;
use crate::domain::{AuthError, ChartError, ExpenseError};

/// An HTTP status plus the message shown to the user
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unauthenticated() -> Self {
        Self::from(ExpenseError::Unauthenticated)
    }
}

impl From<ExpenseError> for ApiError {
    fn from(e: ExpenseError) -> Self {
        let status = match &e {
            ExpenseError::Validation(_) => StatusCode::BAD_REQUEST,
            ExpenseError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ExpenseError::PermissionDenied => StatusCode::FORBIDDEN,
            ExpenseError::NotFound => StatusCode::NOT_FOUND,
            ExpenseError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self::new(status, e.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::from(ExpenseError::Validation(e))
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        let status = match &e {
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::AccountAlreadyExists => StatusCode::CONFLICT,
            AuthError::InvalidEmail | AuthError::WeakPassword => StatusCode::BAD_REQUEST,
            AuthError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self::new(status, e.to_string())
    }
}

impl From<ChartError> for ApiError {
    fn from(e: ChartError) -> Self {
        match e {
            ChartError::NoData => Self::new(StatusCode::NOT_FOUND, "No expenses to chart yet."),
            other => Self::new(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}
