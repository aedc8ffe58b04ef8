//! # Expense Tracker Backend
//!
//! Contains all non-UI logic for the expense tracker.
//!
//! ## Architecture
//!
//! ```text
//! Web frontend
//!     ↓
//! IO Layer (REST API, Server-Sent Events)
//!     ↓
//! Domain Layer (services, view models, aggregation)
//!     ↓
//! Storage Layer (CSV files, live queries)
//! ```

pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

use anyhow::{Context, Result};
use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

pub use config::AppConfig;
use domain::{Clock, ExpenseService, IdentityService, LocalClock};
use io::SessionTokens;
use storage::{CsvConnection, StoreError};

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub expense_service: ExpenseService<CsvConnection>,
    pub identity_service: IdentityService<CsvConnection>,
    pub session_tokens: SessionTokens,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(connection: &CsvConnection, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        Ok(Self {
            expense_service: ExpenseService::new(connection)?,
            identity_service: IdentityService::new(connection)?,
            session_tokens: SessionTokens::new(),
            clock,
        })
    }
}

/// Initialize the backend with all required services
pub async fn initialize_backend(config: &AppConfig) -> Result<AppState> {
    info!("Setting up storage in {}", config.data_directory.display());
    let connection = CsvConnection::new(&config.data_directory)
        .with_context(|| format!("Failed to open data directory {}", config.data_directory.display()))?;

    info!("Setting up domain model");
    let app_state = AppState::new(&connection, Arc::new(LocalClock)).context("Failed to load stored data")?;

    Ok(app_state)
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState, config: &AppConfig) -> Result<Router> {
    let origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin {}", config.cors_origin))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/health", get(io::health))
        .route("/auth/signup", post(io::sign_up))
        .route("/auth/login", post(io::log_in))
        .route("/auth/logout", post(io::log_out))
        .route("/expenses", get(io::list_expenses).post(io::create_expense))
        .route(
            "/expenses/:id",
            get(io::get_expense).put(io::update_expense).delete(io::delete_expense),
        )
        .route("/summary", get(io::get_summary))
        .route("/summary/live", get(io::live_summary))
        .route("/stats/chart", get(io::get_chart_data))
        .route("/stats/chart.svg", get(io::get_chart_svg));

    let mut router = Router::new().nest("/api", api_routes);
    if let Some(static_directory) = &config.static_directory {
        info!("Serving frontend from {}", static_directory.display());
        router = router.fallback_service(ServeDir::new(static_directory));
    }

    Ok(router.layer(cors).with_state(app_state))
}
