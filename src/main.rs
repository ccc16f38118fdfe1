//! Server binary.
//!
//! Reads the environment, migrates the database, then serves the router
//! until Ctrl+C. In-flight requests (including webhook reconciliation) are
//! allowed to finish before exit.

use game_marketplace_api::{config::Config, create_router, db, state::AppState};
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG overrides the default "info"
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;

    let pool = db::create_pool(&config).await?;
    db::run_migrations(&pool).await?;
    tracing::info!(
        max_connections = config.db_max_connections,
        "database ready, migrations applied"
    );

    if config.admin_whatsapp.is_none() {
        tracing::warn!("ADMIN_WHATSAPP not set, admin payment alerts are disabled");
    }

    let addr = format!("0.0.0.0:{}", config.server_port);
    let app = create_router(AppState::new(pool, config)?);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("marketplace API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = signal::ctrl_c().await {
        tracing::error!(?error, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown signal received");
}
