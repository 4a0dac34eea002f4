//! Daily refresh-through price cache keyed by symbol.
//!
//! The database is the cache: a row whose `update_date` is today answers
//! without a network call. Otherwise the quote provider is asked, and a
//! successful quote is written to every row holding the symbol.

use crate::error::AppResult;
use crate::models::{normalize_symbol, round_price};
use crate::quotes::QuoteSource;
use crate::repositories::PositionStore;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

/// Outcome of asking for a symbol's current price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "price", rename_all = "snake_case")]
pub enum PriceStatus {
    /// Confirmed by the provider today
    Fresh(Decimal),
    /// The provider failed; this is the last price we knew.
    /// `update_date` was left alone so the next call retries.
    StaleFallback(Decimal),
    /// The provider failed and no price was ever stored
    Unavailable,
}

impl PriceStatus {
    pub fn price(&self) -> Option<Decimal> {
        match self {
            PriceStatus::Fresh(price) | PriceStatus::StaleFallback(price) => Some(*price),
            PriceStatus::Unavailable => None,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, PriceStatus::Fresh(_))
    }
}

pub struct PriceCache {
    store: Arc<dyn PositionStore>,
    quotes: Arc<dyn QuoteSource>,
    // One lock per symbol so concurrent callers share a single fetch
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PriceCache {
    pub fn new(store: Arc<dyn PositionStore>, quotes: Arc<dyn QuoteSource>) -> Self {
        Self {
            store,
            quotes,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Return a price for `symbol` that is fresh as of `today` when possible.
    ///
    /// Quote failures never surface as errors; they degrade to
    /// [`PriceStatus::StaleFallback`] or [`PriceStatus::Unavailable`].
    /// Storage errors are propagated.
    pub async fn ensure_fresh(&self, symbol: &str, today: NaiveDate) -> AppResult<PriceStatus> {
        let symbol = normalize_symbol(symbol);
        let guard = self.lock_symbol(&symbol).await;
        self.ensure_fresh_locked(&symbol, today, &guard).await
    }

    /// Take the refresh lock for an already normalised `symbol`.
    ///
    /// Callers that write rows for the symbol hold the guard until the write
    /// commits, so the next caller sees that row as a cache hit.
    pub async fn lock_symbol(&self, symbol: &str) -> OwnedMutexGuard<()> {
        let symbol_lock = {
            let mut locks = self.in_flight.lock().await;
            locks
                .entry(symbol.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        symbol_lock.lock_owned().await
    }

    /// [`ensure_fresh`](Self::ensure_fresh) for a caller already holding the
    /// guard from [`lock_symbol`](Self::lock_symbol).
    pub async fn ensure_fresh_locked(
        &self,
        symbol: &str,
        today: NaiveDate,
        _guard: &OwnedMutexGuard<()>,
    ) -> AppResult<PriceStatus> {
        if let Some(price) = self.store.fresh_price(symbol, today).await? {
            debug!("Price cache hit for {} on {}: {}", symbol, today, price);
            return Ok(PriceStatus::Fresh(price));
        }

        match self.quotes.fetch_quote(symbol).await {
            Ok(quote) => {
                // Stored as NUMERIC(14,4); hand back exactly what later hits will read
                let price = round_price(quote);
                let rows = self.store.fan_out_price(symbol, price, today).await?;
                info!("Refreshed {} at {} ({} positions updated)", symbol, price, rows);
                Ok(PriceStatus::Fresh(price))
            }
            Err(e) => {
                warn!("Quote fetch failed for {}: {}", symbol, e);
                match self.store.last_known_price(symbol).await? {
                    Some(price) => Ok(PriceStatus::StaleFallback(price)),
                    None => Ok(PriceStatus::Unavailable),
                }
            }
        }
    }
}
