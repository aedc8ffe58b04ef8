//! # REST API for Period Summaries
//!
//! - **GET /api/summary**: one-shot category totals for a period
//! - **GET /api/summary/live**: the same totals as a Server-Sent Events
//!   stream, updated whenever the caller's expenses change
//!
//! Browsers cannot attach headers to an `EventSource`, so the live endpoint
//! also accepts the session token as a `token` query parameter.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json,
    },
};
use futures_util::{
    future,
    stream::{self, Stream, StreamExt},
};
use serde::Deserialize;
use shared::{LiveSummaryEvent, Period};
use std::sync::Arc;
use tracing::{error, info};

use super::error::ApiError;
use super::mappers::SummaryMapper;
use super::session_tokens::{bearer_token, Authenticated};
use crate::domain::{AggregatorState, Clock, PeriodAggregator, PeriodWindow};
use crate::storage::CsvConnection;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub period: Option<Period>,
    pub token: Option<String>,
}

/// Category totals for the window containing today
pub async fn get_summary(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(query): Query<SummaryQuery>,
) -> impl IntoResponse {
    let period = query.period.unwrap_or_default();
    info!("GET /api/summary - period: {}", period);

    let today = state.clock.today();
    match state.expense_service.summary(&auth.user.id, period, today).await {
        Ok(summary) => {
            let response = SummaryMapper::to_dto(&summary, period, period.window_start(today));
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            error!("Failed to compute summary: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

/// Stream live summary events until the session ends or the query fails
pub async fn live_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SummaryQuery>,
) -> impl IntoResponse {
    let period = query.period.unwrap_or_default();
    info!("GET /api/summary/live - period: {}", period);

    let token = query.token.as_deref().or_else(|| bearer_token(&headers));
    let session = match token.and_then(|token| state.session_tokens.resolve(token)) {
        Some(session) => session,
        None => return ApiError::unauthenticated().into_response(),
    };

    let aggregator = PeriodAggregator::new(
        state.expense_service.clone(),
        state.clock.clone(),
        session.handle(),
        period,
    );
    let events = live_events(aggregator, state.clock.clone()).map(|event| Event::default().json_data(event));
    Sse::new(events).keep_alive(KeepAlive::default()).into_response()
}

/// The aggregator's current state first, then one event per update.
/// A failure or sign-out event is the last one sent.
pub fn live_events(
    aggregator: PeriodAggregator<CsvConnection>,
    clock: Arc<dyn Clock>,
) -> impl Stream<Item = LiveSummaryEvent> + Send {
    let first = current_event(&aggregator, clock.as_ref());
    let updates = stream::unfold(Some((aggregator, clock)), |current| async move {
        let (mut aggregator, clock) = current?;
        if !aggregator.next_update().await {
            return None;
        }
        let event = current_event(&aggregator, clock.as_ref());
        let next = match aggregator.state() {
            AggregatorState::Failed(_) | AggregatorState::SignedOut => None,
            _ => Some((aggregator, clock)),
        };
        Some((event, next))
    });
    stream::once(future::ready(first)).chain(updates)
}

fn current_event(aggregator: &PeriodAggregator<CsvConnection>, clock: &dyn Clock) -> LiveSummaryEvent {
    let period = aggregator.period();
    SummaryMapper::to_live_event(aggregator.state(), period, period.window_start(clock.today()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ExpenseDraft, ExpenseForm, User};
    use crate::io::rest::test_support::TestApp;
    use axum::http::Method;
    use serde_json::json;
    use shared::LiveSummaryStatus;

    fn draft(amount: &str, category: &str, date: &str) -> ExpenseDraft {
        ExpenseDraft::parse(&ExpenseForm {
            amount: amount.to_string(),
            category: category.to_string(),
            occurred_on: date.to_string(),
            comment: String::new(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_week_summary_endpoint() {
        let app = TestApp::new().await;
        let token = app.sign_up("kim@example.com").await;
        for (amount, category, date) in [
            ("12.50", "Food", "2025-03-12"),
            ("7.00", "Food", "2025-03-10"),
            ("20.00", "Transport", "2025-02-11"),
        ] {
            app.request(
                Method::POST,
                "/api/expenses",
                Some(&token),
                Some(json!({"amount": amount, "category": category, "occurred_on": date})),
            )
            .await;
        }

        let (status, body) = app.request(Method::GET, "/api/summary?period=week", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["window_start"], "2025-03-09");
        assert_eq!(body["formatted_total"], "19.50");
        assert_eq!(body["categories"].as_array().unwrap().len(), 1);
        assert_eq!(body["categories"][0]["category"], "Food");

        let (_, body) = app.request(Method::GET, "/api/summary?period=year", Some(&token), None).await;
        assert_eq!(body["formatted_total"], "39.50");
        assert_eq!(body["categories"][0]["category"], "Transport");
    }

    #[tokio::test]
    async fn test_live_stream_follows_changes_and_sign_out() {
        let app = TestApp::new().await;
        let token = app.sign_up("kim@example.com").await;
        let session = app.state.session_tokens.resolve(&token).unwrap();
        let user: User = session.current().unwrap();

        let aggregator = PeriodAggregator::new(
            app.state.expense_service.clone(),
            app.state.clock.clone(),
            session.handle(),
            Period::Week,
        );
        drop(session);
        let mut events = Box::pin(live_events(aggregator, app.state.clock.clone()));

        assert_eq!(events.next().await.unwrap().status, LiveSummaryStatus::Loading);
        let ready = events.next().await.unwrap();
        assert_eq!(ready.status, LiveSummaryStatus::Ready);
        assert_eq!(ready.summary.unwrap().formatted_total, "0.00");

        app.state
            .expense_service
            .create(&user.id, &draft("4.75", "Entertainment", "2025-03-11"))
            .await
            .unwrap();
        let updated = events.next().await.unwrap();
        assert_eq!(updated.summary.unwrap().formatted_total, "4.75");

        app.state.session_tokens.revoke(&token);
        assert_eq!(events.next().await.unwrap().status, LiveSummaryStatus::SignedOut);
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn test_live_stream_ends_on_sign_out_while_session_lives() {
        let app = TestApp::new().await;
        let token = app.sign_up("kim@example.com").await;
        let session = app.state.session_tokens.resolve(&token).unwrap();

        let aggregator = PeriodAggregator::new(
            app.state.expense_service.clone(),
            app.state.clock.clone(),
            session.handle(),
            Period::Day,
        );
        let mut events = Box::pin(live_events(aggregator, app.state.clock.clone()));
        events.next().await;
        assert_eq!(events.next().await.unwrap().status, LiveSummaryStatus::Ready);

        session.log_out();
        assert_eq!(events.next().await.unwrap().status, LiveSummaryStatus::SignedOut);
        assert!(events.next().await.is_none());
        assert!(app.state.session_tokens.resolve(&token).is_some());
    }

    #[tokio::test]
    async fn test_live_endpoint_requires_token() {
        let app = TestApp::new().await;
        let (status, _) = app.request(Method::GET, "/api/summary/live?token=nope", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let token = app.sign_up("kim@example.com").await;
        let response = app
            .raw_request(Method::GET, &format!("/api/summary/live?period=month&token={}", token), None, None)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"].to_str().unwrap(),
            "text/event-stream"
        );
    }
}
