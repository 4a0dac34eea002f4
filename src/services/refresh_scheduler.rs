use crate::clock::Clock;
use crate::error::AppResult;
use crate::repositories::PositionStore;
use crate::services::price_cache::{PriceCache, PriceStatus};
use crate::services::valuation::ValuationEngine;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use serde::Serialize;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info, warn};

/// Counts from one pass over the stale symbols
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub stale_symbols: usize,
    pub refreshed: Vec<String>,
    pub fallback: usize,
    pub failed: usize,
    pub portfolios_revalued: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RefreshRun {
    /// Every position was already confirmed today
    NothingStale,
    Completed(RefreshReport),
}

/// Background task that refreshes every stale symbol once a day
pub struct RefreshScheduler {
    store: Arc<dyn PositionStore>,
    price_cache: Arc<PriceCache>,
    valuation: Arc<ValuationEngine>,
    clock: Arc<dyn Clock>,
    run_at: NaiveTime,
    run_on_startup: bool,
    concurrency: usize,
}

impl RefreshScheduler {
    pub fn new(
        store: Arc<dyn PositionStore>,
        price_cache: Arc<PriceCache>,
        valuation: Arc<ValuationEngine>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            price_cache,
            valuation,
            clock,
            run_at: NaiveTime::from_hms_opt(0, 5, 0).unwrap_or(NaiveTime::MIN),
            run_on_startup: true,
            concurrency: 4,
        }
    }

    /// Set the local time of day the job runs at
    pub fn with_run_at(mut self, run_at: NaiveTime) -> Self {
        self.run_at = run_at;
        self
    }

    /// Run once immediately when started
    pub fn with_run_on_startup(mut self, run_on_startup: bool) -> Self {
        self.run_on_startup = run_on_startup;
        self
    }

    /// Maximum number of symbols refreshed at the same time
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Start the daily refresh loop. Never returns.
    pub async fn start(self) {
        info!("Price refresh scheduler started, runs daily at {}", self.run_at);

        if self.run_on_startup {
            self.run_logged().await;
        }

        loop {
            let wait = duration_until_next_run(self.clock.now(), self.run_at);
            info!("Next price refresh in {}s", wait.as_secs());
            time::sleep(wait).await;

            self.run_logged().await;
        }
    }

    async fn run_logged(&self) {
        let today = self.clock.today();

        match AssertUnwindSafe(self.run_once(today)).catch_unwind().await {
            Ok(Ok(RefreshRun::NothingStale)) => {
                info!("Price refresh for {}: nothing stale", today);
            }
            Ok(Ok(RefreshRun::Completed(report))) => {
                info!(
                    "Refresh for {}: {} stale, {} refreshed, {} fallback, {} failed, {} revalued",
                    today,
                    report.stale_symbols,
                    report.refreshed.len(),
                    report.fallback,
                    report.failed,
                    report.portfolios_revalued
                );
            }
            Ok(Err(e)) => error!("Price refresh for {} failed: {}", today, e),
            Err(_) => error!("Price refresh for {} panicked", today),
        }
    }

    /// Refresh every symbol with a position not confirmed on `today`.
    ///
    /// A failing symbol is counted and skipped. Only the initial stale query
    /// can fail the run as a whole.
    pub async fn run_once(&self, today: NaiveDate) -> AppResult<RefreshRun> {
        let symbols = self.store.stale_symbols(today).await?;
        if symbols.is_empty() {
            return Ok(RefreshRun::NothingStale);
        }

        info!("Refreshing {} stale symbols", symbols.len());

        let results: Vec<(String, AppResult<PriceStatus>)> = stream::iter(symbols)
            .map(|symbol| async move {
                let status = self.price_cache.ensure_fresh(&symbol, today).await;
                (symbol, status)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = RefreshReport {
            stale_symbols: results.len(),
            ..RefreshReport::default()
        };
        // Revaluation prices from these so no symbol is fetched twice in a run
        let mut known = HashMap::with_capacity(results.len());

        for (symbol, status) in results {
            match status {
                Ok(status) => {
                    match status {
                        PriceStatus::Fresh(_) => report.refreshed.push(symbol.clone()),
                        PriceStatus::StaleFallback(_) => report.fallback += 1,
                        PriceStatus::Unavailable => {
                            warn!("No price available for {}", symbol);
                            report.failed += 1;
                        }
                    }
                    known.insert(symbol, status);
                }
                Err(e) => {
                    error!("Failed to refresh {}: {}", symbol, e);
                    report.failed += 1;
                }
            }
        }
        report.refreshed.sort();

        if !report.refreshed.is_empty() {
            match self.store.portfolios_holding(&report.refreshed).await {
                Ok(portfolio_ids) => {
                    report.portfolios_revalued =
                        self.valuation.revalue_all(&portfolio_ids, &known).await;
                }
                Err(e) => error!("Failed to find portfolios to revalue: {}", e),
            }
        }

        Ok(RefreshRun::Completed(report))
    }
}

/// Time from `now` until the next occurrence of `at`
pub fn duration_until_next_run(now: NaiveDateTime, at: NaiveTime) -> Duration {
    let today_run = now.date().and_time(at);
    let next = if today_run > now {
        today_run
    } else {
        today_run + chrono::Duration::days(1)
    };

    (next - now).to_std().unwrap_or(Duration::ZERO)
}
