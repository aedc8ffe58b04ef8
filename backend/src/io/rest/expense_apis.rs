//! # REST API for Expenses
//!
//! Owner-scoped CRUD. Every handler acts on behalf of the bearer-token user;
//! records belonging to anyone else are refused with 403.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use tracing::{error, info, warn};

use super::error::ApiError;
use super::mappers::ExpenseMapper;
use super::session_tokens::Authenticated;
use crate::domain::models::{ExpenseDraft, ExpenseId};
use crate::domain::ExpenseError;
use crate::AppState;
use shared::{DeleteExpenseResponse, ExpenseFormRequest, ExpenseListResponse};

fn failure(action: &str, e: ExpenseError) -> axum::response::Response {
    match &e {
        ExpenseError::Unavailable(detail) => error!("Failed to {}: {}", action, detail),
        other => warn!("Refused to {}: {}", action, other),
    }
    ApiError::from(e).into_response()
}

/// List the caller's expenses, newest first
pub async fn list_expenses(State(state): State<AppState>, auth: Authenticated) -> impl IntoResponse {
    info!("GET /api/expenses - user: {}", auth.user.id);

    match state.expense_service.list(&auth.user.id).await {
        Ok(expenses) => {
            let response = ExpenseListResponse {
                expenses: expenses.into_iter().map(ExpenseMapper::to_dto).collect(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => failure("list expenses", e),
    }
}

/// Create an expense from raw form fields
pub async fn create_expense(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(request): Json<ExpenseFormRequest>,
) -> impl IntoResponse {
    info!("POST /api/expenses - request: {:?}", request);

    let draft = match ExpenseDraft::parse(&ExpenseMapper::to_form(request)) {
        Ok(draft) => draft,
        Err(e) => return ApiError::from(e).into_response(),
    };
    match state.expense_service.create(&auth.user.id, &draft).await {
        Ok(expense) => (StatusCode::CREATED, Json(ExpenseMapper::to_dto(expense))).into_response(),
        Err(e) => failure("create expense", e),
    }
}

/// Fetch one expense for editing
pub async fn get_expense(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/expenses/{}", id);

    match state.expense_service.load_owned(&auth.user.id, &ExpenseId::from(id)).await {
        Ok(expense) => (StatusCode::OK, Json(ExpenseMapper::to_dto(expense))).into_response(),
        Err(e) => failure("load expense", e),
    }
}

/// Overwrite amount, category, date and comment
pub async fn update_expense(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<String>,
    Json(request): Json<ExpenseFormRequest>,
) -> impl IntoResponse {
    info!("PUT /api/expenses/{} - request: {:?}", id, request);

    let draft = match ExpenseDraft::parse(&ExpenseMapper::to_form(request)) {
        Ok(draft) => draft,
        Err(e) => return ApiError::from(e).into_response(),
    };
    match state
        .expense_service
        .update(&auth.user.id, &ExpenseId::from(id), &draft)
        .await
    {
        Ok(expense) => (StatusCode::OK, Json(ExpenseMapper::to_dto(expense))).into_response(),
        Err(e) => failure("update expense", e),
    }
}

pub async fn delete_expense(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/expenses/{}", id);

    let expense_id = ExpenseId::from(id);
    match state.expense_service.delete(&auth.user.id, &expense_id).await {
        Ok(()) => {
            let response = DeleteExpenseResponse {
                id: expense_id.to_string(),
                success_message: "Expense deleted".to_string(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => failure("delete expense", e),
    }
}
