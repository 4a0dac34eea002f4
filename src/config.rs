use chrono::NaiveTime;
use std::env;
use std::time::Duration;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub test_before_acquire: bool,
}

/// Market quote provider configuration
#[derive(Debug, Clone)]
pub struct QuoteConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

/// Daily price refresh job configuration
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Local wall-clock time the daily refresh runs at
    pub run_at: NaiveTime,
    pub on_startup: bool,
    pub concurrency: usize,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub quotes: QuoteConfig,
    pub refresh: RefreshConfig,
    pub log_level: String,
    pub environment: String,
    pub migrations_path: String,
}

impl DatabaseConfig {
    /// Create database config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL environment variable is required")?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(10);

        let acquire_timeout_secs = env::var("DATABASE_ACQUIRE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(30);

        let idle_timeout_secs = env::var("DATABASE_IDLE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(600); // 10 minutes

        let max_lifetime_secs = env::var("DATABASE_MAX_LIFETIME_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1800); // 30 minutes

        let test_before_acquire = env::var("DATABASE_TEST_BEFORE_ACQUIRE")
            .ok()
            .and_then(|s| s.parse::<bool>().ok())
            .unwrap_or(true);

        if max_connections == 0 {
            return Err("DATABASE_MAX_CONNECTIONS must be greater than 0".to_string());
        }

        if acquire_timeout_secs == 0 {
            return Err("DATABASE_ACQUIRE_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(Self {
            url,
            max_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
            test_before_acquire,
        })
    }

    /// Get acquire timeout as Duration
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Get idle timeout as Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Get max lifetime as Duration
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/investor".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
            test_before_acquire: true,
        }
    }
}

impl QuoteConfig {
    pub fn from_env() -> Result<Self, String> {
        let base_url = env::var("QUOTE_API_URL")
            .unwrap_or_else(|_| "https://www.alphavantage.co".to_string());

        let api_key = env::var("QUOTE_API_KEY").unwrap_or_else(|_| "demo".to_string());

        let timeout_secs = env::var("QUOTE_API_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(5);

        if timeout_secs == 0 {
            return Err("QUOTE_API_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout_secs,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.alphavantage.co".to_string(),
            api_key: "demo".to_string(),
            timeout_secs: 5,
        }
    }
}

impl RefreshConfig {
    pub fn from_env() -> Result<Self, String> {
        let run_at = match env::var("REFRESH_AT") {
            Ok(raw) => parse_time_of_day(&raw)?,
            Err(_) => default_run_at(),
        };

        let on_startup = env::var("REFRESH_ON_STARTUP")
            .ok()
            .and_then(|s| s.parse::<bool>().ok())
            .unwrap_or(true);

        let concurrency = env::var("REFRESH_CONCURRENCY")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(4);

        if concurrency == 0 {
            return Err("REFRESH_CONCURRENCY must be greater than 0".to_string());
        }

        Ok(Self {
            run_at,
            on_startup,
            concurrency,
        })
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            run_at: default_run_at(),
            on_startup: true,
            concurrency: 4,
        }
    }
}

fn default_run_at() -> NaiveTime {
    NaiveTime::from_hms_opt(0, 5, 0).unwrap_or(NaiveTime::MIN)
}

/// Parse an `HH:MM` time of day
fn parse_time_of_day(raw: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|e| format!("Invalid REFRESH_AT '{}': expected HH:MM ({})", raw, e))
}

impl AppConfig {
    /// Create application config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let database = DatabaseConfig::from_env()?;
        let quotes = QuoteConfig::from_env()?;
        let refresh = RefreshConfig::from_env()?;

        let log_level = env::var("LOG_LEVEL")
            .unwrap_or_else(|_| "info".to_string());

        let environment = env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string());

        let migrations_path = env::var("MIGRATIONS_PATH")
            .unwrap_or_else(|_| "./migrations".to_string());

        // Validate log level
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_LEVEL: {}. Must be one of: {:?}",
                log_level, valid_log_levels
            ));
        }

        // Validate environment
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&environment.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid ENVIRONMENT: {}. Must be one of: {:?}",
                environment, valid_environments
            ));
        }

        Ok(Self {
            database,
            quotes,
            refresh,
            log_level: log_level.to_lowercase(),
            environment: environment.to_lowercase(),
            migrations_path,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Check if running in development
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Get database URL (convenience method)
    pub fn database_url(&self) -> &str {
        &self.database.url
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            quotes: QuoteConfig::default(),
            refresh: RefreshConfig::default(),
            log_level: "info".to_string(),
            environment: "development".to_string(),
            migrations_path: "./migrations".to_string(),
        }
    }
}
