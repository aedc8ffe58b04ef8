//! # REST API for Category Stats
//!
//! All-time totals per category, as chart data or as a rendered SVG bar chart.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use tracing::{error, info};

use super::error::ApiError;
use super::session_tokens::Authenticated;
use crate::domain::{ChartRenderer, SvgBarChart};
use crate::AppState;

pub async fn get_chart_data(State(state): State<AppState>, auth: Authenticated) -> impl IntoResponse {
    info!("GET /api/stats/chart - user: {}", auth.user.id);

    match state.expense_service.chart(&auth.user.id).await {
        Ok(data) => (StatusCode::OK, Json(data)).into_response(),
        Err(e) => {
            error!("Failed to fetch stats: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

pub async fn get_chart_svg(State(state): State<AppState>, auth: Authenticated) -> impl IntoResponse {
    info!("GET /api/stats/chart.svg - user: {}", auth.user.id);

    let data = match state.expense_service.chart(&auth.user.id).await {
        Ok(data) => data,
        Err(e) => {
            error!("Failed to fetch stats: {}", e);
            return ApiError::from(e).into_response();
        }
    };
    match SvgBarChart::default().render(&data) {
        Ok(svg) => (StatusCode::OK, [(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}
