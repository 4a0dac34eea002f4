use crate::error::RepositoryError;
use crate::models::{LeaderboardEntry, Portfolio};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

/// Repository for portfolio data access
pub struct PortfolioRepository {
    pool: PgPool,
}

impl PortfolioRepository {
    /// Create a new PortfolioRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new portfolio. Net worth starts equal to the cash balance.
    pub async fn create(
        &self,
        user_id: Uuid,
        name: &str,
        cash: Decimal,
    ) -> Result<Portfolio, RepositoryError> {
        let portfolio = sqlx::query_as::<_, Portfolio>(
            r#"
            INSERT INTO portfolios (user_id, name, cash, net_worth)
            VALUES ($1, $2, $3, $3)
            RETURNING id, user_id, name, cash, net_worth, created_at
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(cash)
        .fetch_one(&self.pool)
        .await?;

        Ok(portfolio)
    }

    /// Find a portfolio by UUID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Portfolio>, RepositoryError> {
        let portfolio = sqlx::query_as::<_, Portfolio>(
            r#"
            SELECT id, user_id, name, cash, net_worth, created_at
            FROM portfolios
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(portfolio)
    }

    /// Store a freshly computed net worth
    pub async fn set_net_worth(
        &self,
        id: Uuid,
        net_worth: Decimal,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE portfolios SET net_worth = $2 WHERE id = $1")
            .bind(id)
            .bind(net_worth)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("Portfolio {} not found", id)));
        }

        Ok(())
    }

    /// Delete a portfolio and its stocks
    pub async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM portfolios WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Top portfolios by cached net worth
    pub async fn top_by_net_worth(
        &self,
        limit: i64,
    ) -> Result<Vec<LeaderboardEntry>, RepositoryError> {
        let entries = sqlx::query_as::<_, LeaderboardEntry>(
            r#"
            SELECT p.id AS portfolio_id, p.name AS portfolio_name, u.username, p.net_worth
            FROM portfolios p
            JOIN users u ON u.id = p.user_id
            ORDER BY p.net_worth DESC, p.created_at
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Portfolios holding any of the given symbols
    pub async fn ids_holding_symbols(
        &self,
        symbols: &[String],
    ) -> Result<Vec<Uuid>, RepositoryError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT DISTINCT portfolio_id
            FROM stocks
            WHERE symbol = ANY($1)
            "#,
        )
        .bind(symbols)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}
