//! Investor Backend Library
//!
//! Portfolio valuation and stock price refresh for the Investor stock
//! simulator. Web handlers and the worker binary build an [`AppState`] and
//! call into its services.

pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod quotes;
pub mod repositories;
pub mod services;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};

use clock::Clock;
use config::RefreshConfig;
use quotes::QuoteSource;
use repositories::*;
use services::{PortfolioService, PriceCache, RefreshScheduler, ValuationEngine};
use std::sync::Arc;

/// Application state containing all repositories and services
pub struct AppState {
    pub user_repo: Arc<UserRepository>,
    pub portfolio_repo: Arc<PortfolioRepository>,
    pub stock_repo: Arc<StockRepository>,
    pub store: Arc<dyn PositionStore>,
    pub clock: Arc<dyn Clock>,
    pub price_cache: Arc<PriceCache>,
    pub valuation: Arc<ValuationEngine>,
    pub portfolio_service: Arc<PortfolioService>,
}

impl AppState {
    /// Create a new AppState with the given quote source and clock
    pub fn new(pool: sqlx::PgPool, quotes: Arc<dyn QuoteSource>, clock: Arc<dyn Clock>) -> Self {
        let user_repo = Arc::new(UserRepository::new(pool.clone()));
        let portfolio_repo = Arc::new(PortfolioRepository::new(pool.clone()));
        let stock_repo = Arc::new(StockRepository::new(pool));

        let store: Arc<dyn PositionStore> = Arc::new(PgPositionStore::new(
            user_repo.clone(),
            portfolio_repo.clone(),
            stock_repo.clone(),
        ));

        let price_cache = Arc::new(PriceCache::new(store.clone(), quotes));
        let valuation = Arc::new(ValuationEngine::new(
            store.clone(),
            price_cache.clone(),
            clock.clone(),
        ));
        let portfolio_service = Arc::new(PortfolioService::new(
            store.clone(),
            price_cache.clone(),
            clock.clone(),
        ));

        Self {
            user_repo,
            portfolio_repo,
            stock_repo,
            store,
            clock,
            price_cache,
            valuation,
            portfolio_service,
        }
    }

    /// Build the daily refresh job over this state's services
    pub fn refresh_scheduler(&self, config: &RefreshConfig) -> RefreshScheduler {
        RefreshScheduler::new(
            self.store.clone(),
            self.price_cache.clone(),
            self.valuation.clone(),
            self.clock.clone(),
        )
        .with_run_at(config.run_at)
        .with_run_on_startup(config.on_startup)
        .with_concurrency(config.concurrency)
    }
}
