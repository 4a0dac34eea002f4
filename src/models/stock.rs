use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A portfolio's position in one ticker symbol.
///
/// Rows are never stored with a zero quantity; selling down to zero deletes
/// the row. `update_date` is the local date of the last successful quote and
/// is `None` when the price has never been confirmed by the provider.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Stock {
    pub id: Uuid,
    pub portfolio_id: Uuid,
    pub symbol: String,
    pub quantity: i32,
    pub price: Decimal,
    pub update_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
}

/// Decimal places kept for share prices, matching the `stocks.price` column
pub const PRICE_SCALE: u32 = 4;

impl Stock {
    /// Market value at the stored price
    pub fn market_value(&self) -> Decimal {
        Decimal::from(self.quantity) * self.price
    }
}

/// Values for a position about to be opened
#[derive(Debug, Clone)]
pub struct NewPosition {
    pub portfolio_id: Uuid,
    pub symbol: String,
    pub quantity: i32,
    pub price: Decimal,
    pub update_date: Option<NaiveDate>,
}

/// Round a quoted price to the scale prices are stored at
pub fn round_price(price: Decimal) -> Decimal {
    price.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Normalise a ticker symbol for storage and lookup
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}
