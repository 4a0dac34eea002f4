//! Domain models for the Investor backend.
//!
//! Database-backed rows for users, their portfolios and the stock
//! positions held in each portfolio.

pub mod portfolio;
pub mod stock;
pub mod user;

// Re-export all models for convenient access
pub use portfolio::{LeaderboardEntry, Portfolio, DEFAULT_PORTFOLIO_CASH};
pub use stock::{normalize_symbol, round_price, NewPosition, Stock, PRICE_SCALE};
pub use user::{ProfileUpdate, User, DEFAULT_IMAGE_URL};
