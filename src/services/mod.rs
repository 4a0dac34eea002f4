pub mod portfolio_service;
pub mod price_cache;
pub mod refresh_scheduler;
pub mod valuation;

pub use portfolio_service::PortfolioService;
pub use price_cache::{PriceCache, PriceStatus};
pub use refresh_scheduler::{RefreshReport, RefreshRun, RefreshScheduler};
pub use valuation::{round_currency, PositionValue, Valuation, ValuationEngine};
