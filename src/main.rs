//! Investor Backend Worker
//!
//! Connects to the database, runs migrations and keeps stock prices fresh
//! with the daily refresh job until interrupted.

use investor_backend::clock::LocalClock;
use investor_backend::database::{create_pool, run_migrations};
use investor_backend::quotes::HttpQuoteClient;
use investor_backend::{AppConfig, AppError, AppResult, AppState};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load environment variables first
    dotenv::dotenv().ok();

    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        AppError::Config(e)
    })?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("investor_backend={},sqlx=warn", config.log_level).into()
            }),
        )
        .init();

    info!("Investor backend starting");
    info!("Environment: {}", config.environment);
    info!("Log level: {}", config.log_level);
    info!("Quote provider: {}", config.quotes.base_url);

    // =========================================================================
    // DATABASE SETUP
    // =========================================================================
    info!("Connecting to database...");

    let pool = create_pool(&config.database).await.map_err(|e| {
        error!("Failed to create database pool: {}", e);
        AppError::Database(e)
    })?;

    info!("Database pool ready (max connections: {})", config.database.max_connections);

    info!("Running database migrations...");
    run_migrations(&pool, Some(&config.migrations_path))
        .await
        .map_err(|e| {
            error!("Database migration failed: {}", e);
            AppError::Database(e)
        })?;

    // =========================================================================
    // SERVICES
    // =========================================================================
    let quotes = HttpQuoteClient::new(&config.quotes)
        .map_err(|e| AppError::Config(format!("Failed to build quote client: {}", e)))?;

    let app_state = AppState::new(pool, Arc::new(quotes), Arc::new(LocalClock));
    info!("✓ Application state initialized");

    let scheduler = app_state.refresh_scheduler(&config.refresh);
    let scheduler_handle = tokio::spawn(async move {
        scheduler.start().await;
    });
    info!("✓ Price refresh scheduler started (daily at {})", config.refresh.run_at);

    // =========================================================================
    // SHUTDOWN HANDLING
    // =========================================================================
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, shutting down gracefully...");
        }
        _ = scheduler_handle => {
            error!("Price refresh scheduler exited unexpectedly");
        }
    }

    info!("Investor backend shutdown complete");
    Ok(())
}
