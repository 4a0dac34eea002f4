use crate::clock::Clock;
use crate::error::{AppError, AppResult};
use crate::models::{
    normalize_symbol, LeaderboardEntry, NewPosition, Portfolio, Stock, DEFAULT_PORTFOLIO_CASH,
};
use crate::repositories::PositionStore;
use crate::services::price_cache::{PriceCache, PriceStatus};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Service for portfolio and position changes made on behalf of a user.
/// Callers are expected to have authorized the user already.
pub struct PortfolioService {
    store: Arc<dyn PositionStore>,
    price_cache: Arc<PriceCache>,
    clock: Arc<dyn Clock>,
}

impl PortfolioService {
    pub fn new(
        store: Arc<dyn PositionStore>,
        price_cache: Arc<PriceCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            price_cache,
            clock,
        }
    }

    /// Create a portfolio funded with the default starting cash
    pub async fn create_portfolio(&self, user_id: Uuid, name: &str) -> AppResult<Portfolio> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Portfolio name is required".into()));
        }

        if !self.store.user_exists(user_id).await? {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }

        let portfolio = self
            .store
            .create_portfolio(user_id, name, DEFAULT_PORTFOLIO_CASH)
            .await?;

        info!("Created portfolio {} ({}) for user {}", portfolio.name, portfolio.id, user_id);
        Ok(portfolio)
    }

    /// Buy `quantity` shares of a symbol not yet held in the portfolio
    pub async fn add_position(
        &self,
        portfolio_id: Uuid,
        symbol: &str,
        quantity: i32,
    ) -> AppResult<Stock> {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return Err(AppError::Validation("Symbol is required".into()));
        }
        if quantity < 1 {
            return Err(AppError::Validation(format!(
                "Quantity must be at least 1, got {}",
                quantity
            )));
        }

        if self.store.find_portfolio(portfolio_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Portfolio {} not found", portfolio_id)));
        }

        let today = self.clock.today();

        // Held until the row is inserted so a concurrent buyer of the same
        // symbol reads this price instead of fetching its own
        let guard = self.price_cache.lock_symbol(&symbol).await;
        let status = self
            .price_cache
            .ensure_fresh_locked(&symbol, today, &guard)
            .await?;
        let (price, update_date) = match status {
            PriceStatus::Fresh(price) => (price, Some(today)),
            PriceStatus::StaleFallback(price) => (price, None),
            PriceStatus::Unavailable => return Err(AppError::UnknownSymbol(symbol)),
        };

        let stock = self
            .store
            .open_position(NewPosition {
                portfolio_id,
                symbol,
                quantity,
                price,
                update_date,
            })
            .await?;
        drop(guard);

        info!(
            "Portfolio {} bought {} {} at {}",
            portfolio_id, stock.quantity, stock.symbol, stock.price
        );
        Ok(stock)
    }

    /// Change a position's quantity, buying or selling the difference at the
    /// current price. Zero removes the position and returns `None`.
    pub async fn set_quantity(&self, stock_id: Uuid, quantity: i32) -> AppResult<Option<Stock>> {
        if quantity < 0 {
            return Err(AppError::Validation(format!(
                "Quantity must not be negative, got {}",
                quantity
            )));
        }

        let stock = self
            .store
            .find_position(stock_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Stock {} not found", stock_id)))?;

        let price = self
            .price_cache
            .ensure_fresh(&stock.symbol, self.clock.today())
            .await?
            .price()
            .unwrap_or(stock.price);

        let updated = self.store.change_quantity(stock_id, quantity, price).await?;

        match &updated {
            Some(s) => info!("Position {} in {} set to {}", s.id, s.symbol, s.quantity),
            None => info!("Position {} in {} closed", stock_id, stock.symbol),
        }

        Ok(updated)
    }

    /// Delete a portfolio together with its positions
    pub async fn delete_portfolio(&self, portfolio_id: Uuid) -> AppResult<()> {
        if !self.store.delete_portfolio(portfolio_id).await? {
            return Err(AppError::NotFound(format!("Portfolio {} not found", portfolio_id)));
        }

        info!("Deleted portfolio {}", portfolio_id);
        Ok(())
    }

    /// Portfolios ranked by their last computed net worth
    pub async fn leaderboard(&self, limit: i64) -> AppResult<Vec<LeaderboardEntry>> {
        if limit < 1 {
            return Err(AppError::Validation("Leaderboard size must be positive".into()));
        }

        self.store.top_portfolios(limit).await
    }
}
