//! Repository for stock positions, including the same-symbol price fan-out

use crate::error::RepositoryError;
use crate::models::{NewPosition, Stock};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

pub struct StockRepository {
    pool: PgPool,
}

impl StockRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Stock>, RepositoryError> {
        let stock = sqlx::query_as::<_, Stock>(
            r#"
            SELECT id, portfolio_id, symbol, quantity, price, update_date, created_at
            FROM stocks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(stock)
    }

    pub async fn find_by_portfolio(
        &self,
        portfolio_id: Uuid,
    ) -> Result<Vec<Stock>, RepositoryError> {
        let stocks = sqlx::query_as::<_, Stock>(
            r#"
            SELECT id, portfolio_id, symbol, quantity, price, update_date, created_at
            FROM stocks
            WHERE portfolio_id = $1
            ORDER BY symbol
            "#,
        )
        .bind(portfolio_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(stocks)
    }

    /// Price confirmed for `symbol` on `today`, if any row carries one
    pub async fn fresh_price(
        &self,
        symbol: &str,
        today: NaiveDate,
    ) -> Result<Option<Decimal>, RepositoryError> {
        let price = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT price
            FROM stocks
            WHERE symbol = $1 AND update_date = $2
            LIMIT 1
            "#,
        )
        .bind(symbol)
        .bind(today)
        .fetch_optional(&self.pool)
        .await?;

        Ok(price)
    }

    /// Most recently confirmed price for `symbol`, falling back to the newest
    /// row when none has ever been confirmed
    pub async fn last_known_price(&self, symbol: &str) -> Result<Option<Decimal>, RepositoryError> {
        let price = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT price
            FROM stocks
            WHERE symbol = $1
            ORDER BY update_date DESC NULLS LAST, created_at DESC
            LIMIT 1
            "#,
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;

        Ok(price)
    }

    /// Distinct symbols with at least one stale position
    pub async fn stale_symbols(&self, today: NaiveDate) -> Result<Vec<String>, RepositoryError> {
        let symbols = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT symbol
            FROM stocks
            WHERE update_date IS NULL OR update_date <> $1
            ORDER BY symbol
            "#,
        )
        .bind(today)
        .fetch_all(&self.pool)
        .await?;

        Ok(symbols)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Set `price` and `update_date` on every row holding `symbol`.
    /// One statement, so readers never see a partially applied quote.
    pub async fn fan_out_price(
        &self,
        symbol: &str,
        price: Decimal,
        today: NaiveDate,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE stocks
            SET price = $2, update_date = $3
            WHERE symbol = $1
            "#,
        )
        .bind(symbol)
        .bind(price)
        .bind(today)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Open a position and pay for it from the portfolio's cash
    pub async fn open_position(&self, position: &NewPosition) -> Result<Stock, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let cash = sqlx::query_scalar::<_, Decimal>(
            "SELECT cash FROM portfolios WHERE id = $1 FOR UPDATE",
        )
        .bind(position.portfolio_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            RepositoryError::NotFound(format!("Portfolio {} not found", position.portfolio_id))
        })?;

        let cost = Decimal::from(position.quantity) * position.price;
        if cost > cash {
            return Err(RepositoryError::InvalidInput(format!(
                "Insufficient cash: available {}, required {}",
                cash, cost
            )));
        }

        let stock = sqlx::query_as::<_, Stock>(
            r#"
            INSERT INTO stocks (portfolio_id, symbol, quantity, price, update_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, portfolio_id, symbol, quantity, price, update_date, created_at
            "#,
        )
        .bind(position.portfolio_id)
        .bind(&position.symbol)
        .bind(position.quantity)
        .bind(position.price)
        .bind(position.update_date)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE portfolios SET cash = cash - $2 WHERE id = $1")
            .bind(position.portfolio_id)
            .bind(cost)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(stock)
    }

    /// Change a position's quantity, settling the difference in cash at
    /// `price`. A quantity of zero deletes the row and returns `None`.
    pub async fn change_quantity(
        &self,
        stock_id: Uuid,
        quantity: i32,
        price: Decimal,
    ) -> Result<Option<Stock>, RepositoryError> {
        if quantity < 0 {
            return Err(RepositoryError::InvalidInput(format!(
                "Quantity must not be negative, got {}",
                quantity
            )));
        }

        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Stock>(
            r#"
            SELECT id, portfolio_id, symbol, quantity, price, update_date, created_at
            FROM stocks
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(stock_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| RepositoryError::NotFound(format!("Stock {} not found", stock_id)))?;

        let cash = sqlx::query_scalar::<_, Decimal>(
            "SELECT cash FROM portfolios WHERE id = $1 FOR UPDATE",
        )
        .bind(current.portfolio_id)
        .fetch_one(&mut *tx)
        .await?;

        let cost = Decimal::from(quantity - current.quantity) * price;
        if cost > cash {
            return Err(RepositoryError::InvalidInput(format!(
                "Insufficient cash: available {}, required {}",
                cash, cost
            )));
        }

        sqlx::query("UPDATE portfolios SET cash = cash - $2 WHERE id = $1")
            .bind(current.portfolio_id)
            .bind(cost)
            .execute(&mut *tx)
            .await?;

        let updated = if quantity == 0 {
            sqlx::query("DELETE FROM stocks WHERE id = $1")
                .bind(stock_id)
                .execute(&mut *tx)
                .await?;
            None
        } else {
            let stock = sqlx::query_as::<_, Stock>(
                r#"
                UPDATE stocks
                SET quantity = $2
                WHERE id = $1
                RETURNING id, portfolio_id, symbol, quantity, price, update_date, created_at
                "#,
            )
            .bind(stock_id)
            .bind(quantity)
            .fetch_one(&mut *tx)
            .await?;
            Some(stock)
        };

        tx.commit().await?;

        Ok(updated)
    }
}
