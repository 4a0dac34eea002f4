//! Market quote client.
//!
//! Wraps an Alpha Vantage style `GLOBAL_QUOTE` endpoint. Every failure
//! (transport, HTTP status, response shape, unknown symbol) is reported as a
//! [`FetchError`]; callers treat them all the same way.

use crate::config::QuoteConfig;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// A quote could not be obtained for a symbol
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request for {symbol} failed: {reason}")]
    Network { symbol: String, reason: String },

    #[error("quote provider returned HTTP {status} for {symbol}")]
    Status { symbol: String, status: u16 },

    #[error("malformed quote for {symbol}: {reason}")]
    Malformed { symbol: String, reason: String },

    #[error("no quote available for {0}")]
    UnknownSymbol(String),
}

/// Source of latest trade prices
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Fetch the latest trade price for `symbol`
    async fn fetch_quote(&self, symbol: &str) -> Result<Decimal, FetchError>;
}

#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<HashMap<String, String>>,
}

const PRICE_FIELD: &str = "05. price";

/// Extract the latest price from a `GLOBAL_QUOTE` response body
pub fn parse_global_quote(symbol: &str, body: &str) -> Result<Decimal, FetchError> {
    let response: GlobalQuoteResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed {
            symbol: symbol.to_string(),
            reason: e.to_string(),
        })?;

    // The provider answers unknown symbols with an empty object
    let quote = match response.global_quote {
        Some(quote) if !quote.is_empty() => quote,
        _ => return Err(FetchError::UnknownSymbol(symbol.to_string())),
    };

    let raw = quote.get(PRICE_FIELD).ok_or_else(|| FetchError::Malformed {
        symbol: symbol.to_string(),
        reason: format!("missing '{}'", PRICE_FIELD),
    })?;

    let price = Decimal::from_str(raw.trim()).map_err(|e| FetchError::Malformed {
        symbol: symbol.to_string(),
        reason: format!("'{}' is not a number: {}", raw, e),
    })?;

    if price <= Decimal::ZERO {
        return Err(FetchError::Malformed {
            symbol: symbol.to_string(),
            reason: format!("non-positive price {}", price),
        });
    }

    Ok(price)
}

/// HTTP client for the quote provider
pub struct HttpQuoteClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpQuoteClient {
    /// Create a client whose requests are bounded by the configured timeout
    pub fn new(config: &QuoteConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl QuoteSource for HttpQuoteClient {
    async fn fetch_quote(&self, symbol: &str) -> Result<Decimal, FetchError> {
        let network = |e: reqwest::Error| FetchError::Network {
            symbol: symbol.to_string(),
            reason: e.to_string(),
        };

        let response = self
            .client
            .get(format!("{}/query", self.base_url))
            .query(&[
                ("function", "GLOBAL_QUOTE"),
                ("symbol", symbol),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                symbol: symbol.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(network)?;
        let price = parse_global_quote(symbol, &body)?;
        debug!("Fetched quote {} = {}", symbol, price);

        Ok(price)
    }
}
