use anyhow::Result;
use expense_tracker_backend::{create_router, initialize_backend, AppConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;

    // RUST_LOG wins over the configured filter
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Setting up backend");
    let app_state = initialize_backend(&config).await?;
    let app = create_router(app_state, &config)?;

    info!("Starting server on {}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    info!("Listening on {}", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
