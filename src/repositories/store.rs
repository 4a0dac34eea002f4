//! The persistence boundary used by the pricing and valuation services.
//!
//! Services depend on [`PositionStore`] rather than on the concrete
//! repositories so they can run against PostgreSQL in production and against
//! an in-memory store in tests.

use crate::error::AppResult;
use crate::models::{LeaderboardEntry, NewPosition, Portfolio, Stock};
use crate::repositories::{PortfolioRepository, StockRepository, UserRepository};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait PositionStore: Send + Sync {
    async fn user_exists(&self, user_id: Uuid) -> AppResult<bool>;

    async fn create_portfolio(
        &self,
        user_id: Uuid,
        name: &str,
        cash: Decimal,
    ) -> AppResult<Portfolio>;

    async fn find_portfolio(&self, portfolio_id: Uuid) -> AppResult<Option<Portfolio>>;

    async fn delete_portfolio(&self, portfolio_id: Uuid) -> AppResult<bool>;

    async fn store_net_worth(&self, portfolio_id: Uuid, net_worth: Decimal) -> AppResult<()>;

    async fn top_portfolios(&self, limit: i64) -> AppResult<Vec<LeaderboardEntry>>;

    /// Portfolios holding at least one of `symbols`
    async fn portfolios_holding(&self, symbols: &[String]) -> AppResult<Vec<Uuid>>;

    async fn find_position(&self, stock_id: Uuid) -> AppResult<Option<Stock>>;

    async fn positions_for_portfolio(&self, portfolio_id: Uuid) -> AppResult<Vec<Stock>>;

    /// Price of any row for `symbol` whose `update_date` is `today`
    async fn fresh_price(&self, symbol: &str, today: NaiveDate) -> AppResult<Option<Decimal>>;

    /// Most recently confirmed price for `symbol`, regardless of date
    async fn last_known_price(&self, symbol: &str) -> AppResult<Option<Decimal>>;

    /// Apply a quote to every row holding `symbol` atomically.
    /// Returns the number of rows updated.
    async fn fan_out_price(&self, symbol: &str, price: Decimal, today: NaiveDate) -> AppResult<u64>;

    /// Distinct symbols with a position not confirmed on `today`
    async fn stale_symbols(&self, today: NaiveDate) -> AppResult<Vec<String>>;

    /// Insert a position and debit its cost from the portfolio in one transaction
    async fn open_position(&self, position: NewPosition) -> AppResult<Stock>;

    /// Set a position's quantity, settling the difference in cash at `price`.
    /// Zero deletes the position and yields `None`.
    async fn change_quantity(
        &self,
        stock_id: Uuid,
        quantity: i32,
        price: Decimal,
    ) -> AppResult<Option<Stock>>;
}

/// PostgreSQL-backed [`PositionStore`]
pub struct PgPositionStore {
    user_repo: Arc<UserRepository>,
    portfolio_repo: Arc<PortfolioRepository>,
    stock_repo: Arc<StockRepository>,
}

impl PgPositionStore {
    pub fn new(
        user_repo: Arc<UserRepository>,
        portfolio_repo: Arc<PortfolioRepository>,
        stock_repo: Arc<StockRepository>,
    ) -> Self {
        Self {
            user_repo,
            portfolio_repo,
            stock_repo,
        }
    }
}

#[async_trait]
impl PositionStore for PgPositionStore {
    async fn user_exists(&self, user_id: Uuid) -> AppResult<bool> {
        Ok(self.user_repo.find_by_id(user_id).await?.is_some())
    }

    async fn create_portfolio(
        &self,
        user_id: Uuid,
        name: &str,
        cash: Decimal,
    ) -> AppResult<Portfolio> {
        Ok(self.portfolio_repo.create(user_id, name, cash).await?)
    }

    async fn find_portfolio(&self, portfolio_id: Uuid) -> AppResult<Option<Portfolio>> {
        Ok(self.portfolio_repo.find_by_id(portfolio_id).await?)
    }

    async fn delete_portfolio(&self, portfolio_id: Uuid) -> AppResult<bool> {
        Ok(self.portfolio_repo.delete(portfolio_id).await?)
    }

    async fn store_net_worth(&self, portfolio_id: Uuid, net_worth: Decimal) -> AppResult<()> {
        Ok(self.portfolio_repo.set_net_worth(portfolio_id, net_worth).await?)
    }

    async fn top_portfolios(&self, limit: i64) -> AppResult<Vec<LeaderboardEntry>> {
        Ok(self.portfolio_repo.top_by_net_worth(limit).await?)
    }

    async fn portfolios_holding(&self, symbols: &[String]) -> AppResult<Vec<Uuid>> {
        Ok(self.portfolio_repo.ids_holding_symbols(symbols).await?)
    }

    async fn find_position(&self, stock_id: Uuid) -> AppResult<Option<Stock>> {
        Ok(self.stock_repo.find_by_id(stock_id).await?)
    }

    async fn positions_for_portfolio(&self, portfolio_id: Uuid) -> AppResult<Vec<Stock>> {
        Ok(self.stock_repo.find_by_portfolio(portfolio_id).await?)
    }

    async fn fresh_price(&self, symbol: &str, today: NaiveDate) -> AppResult<Option<Decimal>> {
        Ok(self.stock_repo.fresh_price(symbol, today).await?)
    }

    async fn last_known_price(&self, symbol: &str) -> AppResult<Option<Decimal>> {
        Ok(self.stock_repo.last_known_price(symbol).await?)
    }

    async fn fan_out_price(
        &self,
        symbol: &str,
        price: Decimal,
        today: NaiveDate,
    ) -> AppResult<u64> {
        Ok(self.stock_repo.fan_out_price(symbol, price, today).await?)
    }

    async fn stale_symbols(&self, today: NaiveDate) -> AppResult<Vec<String>> {
        Ok(self.stock_repo.stale_symbols(today).await?)
    }

    async fn open_position(&self, position: NewPosition) -> AppResult<Stock> {
        Ok(self.stock_repo.open_position(&position).await?)
    }

    async fn change_quantity(
        &self,
        stock_id: Uuid,
        quantity: i32,
        price: Decimal,
    ) -> AppResult<Option<Stock>> {
        Ok(self.stock_repo.change_quantity(stock_id, quantity, price).await?)
    }
}
