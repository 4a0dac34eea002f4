pub mod portfolio_repository;
pub mod stock_repository;
pub mod store;
pub mod user_repository;

// Re-export all repositories for convenient access
pub use portfolio_repository::PortfolioRepository;
pub use stock_repository::StockRepository;
pub use store::{PgPositionStore, PositionStore};
pub use user_repository::UserRepository;
