use crate::clock::Clock;
use crate::error::{AppError, AppResult};
use crate::repositories::PositionStore;
use crate::services::price_cache::{PriceCache, PriceStatus};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Round a currency amount to cents, halves away from zero
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// One position as it was priced during a valuation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionValue {
    pub stock_id: Uuid,
    pub symbol: String,
    pub quantity: i32,
    pub price: Decimal,
    pub market_value: Decimal,
    /// False when the price could not be confirmed today
    pub fresh: bool,
}

/// Result of recomputing a portfolio's net worth
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Valuation {
    pub portfolio_id: Uuid,
    pub cash: Decimal,
    pub net_worth: Decimal,
    pub positions: Vec<PositionValue>,
}

impl Valuation {
    /// Whether any position is priced from a stale fallback
    pub fn has_stale_prices(&self) -> bool {
        self.positions.iter().any(|p| !p.fresh)
    }
}

/// Recomputes `cash + Σ(quantity × price)` after refreshing every position
pub struct ValuationEngine {
    store: Arc<dyn PositionStore>,
    price_cache: Arc<PriceCache>,
    clock: Arc<dyn Clock>,
}

impl ValuationEngine {
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

    /// Refresh the portfolio's positions, then compute and persist its net worth
    pub async fn recompute_net_worth(&self, portfolio_id: Uuid) -> AppResult<Valuation> {
        self.recompute_net_worth_with(portfolio_id, &HashMap::new()).await
    }

    /// Same as [`recompute_net_worth`](Self::recompute_net_worth), except that
    /// symbols found in `known` are priced from those statuses and are not
    /// looked up again.
    pub async fn recompute_net_worth_with(
        &self,
        portfolio_id: Uuid,
        known: &HashMap<String, PriceStatus>,
    ) -> AppResult<Valuation> {
        let portfolio = self
            .store
            .find_portfolio(portfolio_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Portfolio {} not found", portfolio_id)))?;

        let today = self.clock.today();
        let stocks = self.store.positions_for_portfolio(portfolio_id).await?;

        let mut positions = Vec::with_capacity(stocks.len());
        for mut stock in stocks {
            let status = match known.get(&stock.symbol) {
                Some(status) => *status,
                None => self.price_cache.ensure_fresh(&stock.symbol, today).await?,
            };
            // Unavailable keeps the row's own price
            if let Some(price) = status.price() {
                stock.price = price;
            }

            positions.push(PositionValue {
                stock_id: stock.id,
                market_value: stock.market_value(),
                price: stock.price,
                quantity: stock.quantity,
                symbol: stock.symbol,
                fresh: status.is_fresh(),
            });
        }

        let holdings: Decimal = positions.iter().map(|p| p.market_value).sum();
        let net_worth = round_currency(portfolio.cash + holdings);

        self.store.store_net_worth(portfolio_id, net_worth).await?;

        info!(
            "Portfolio {} valued at {} ({} positions)",
            portfolio_id,
            net_worth,
            positions.len()
        );

        Ok(Valuation {
            portfolio_id,
            cash: portfolio.cash,
            net_worth,
            positions,
        })
    }

    /// Revalue several portfolios, skipping the ones that fail.
    /// Symbols in `known` are not looked up again. Returns how many were revalued.
    pub async fn revalue_all(
        &self,
        portfolio_ids: &[Uuid],
        known: &HashMap<String, PriceStatus>,
    ) -> usize {
        let mut revalued = 0;

        for portfolio_id in portfolio_ids {
            match self.recompute_net_worth_with(*portfolio_id, known).await {
                Ok(_) => revalued += 1,
                Err(e) => error!("Failed to revalue portfolio {}: {}", portfolio_id, e),
            }
        }

        revalued
    }
}
