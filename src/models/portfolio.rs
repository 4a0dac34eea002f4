use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Starting cash for a new portfolio
pub const DEFAULT_PORTFOLIO_CASH: Decimal = Decimal::from_parts(10000, 0, 0, false, 0);

/// A named portfolio of virtual cash and stock positions.
///
/// `net_worth` is a cached value. It is only accurate right after the
/// valuation engine recomputes it and is not kept in sync as prices move.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Portfolio {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub cash: Decimal,
    pub net_worth: Decimal,
    pub created_at: NaiveDateTime,
}

/// Leaderboard row: a portfolio ranked by its cached net worth
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LeaderboardEntry {
    pub portfolio_id: Uuid,
    pub portfolio_name: String,
    pub username: String,
    pub net_worth: Decimal,
}
