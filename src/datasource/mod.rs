//! Price source abstraction for fetching daily price history.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::fmt;

pub mod mock;
pub mod stockdata;

pub use mock::MockPriceSource;
pub use stockdata::StockDataSource;

/// Source of raw end-of-day price records.
///
/// Implementations own transport concerns (auth, timeout, retry). They
/// return the payload untouched; normalization happens in the engine.
#[async_trait]
pub trait PriceSource: Send + Sync + fmt::Debug {
    /// Fetch daily price records for a symbol.
    ///
    /// # Arguments
    /// * `symbol` - Ticker symbol (e.g., "AAPL")
    /// * `date_from` - First date wanted (inclusive)
    /// * `date_to` - Last date wanted (inclusive); `None` means "up to latest"
    async fn fetch_prices(
        &self,
        symbol: &str,
        date_from: NaiveDate,
        date_to: Option<NaiveDate>,
    ) -> Result<serde_json::Value, DataSourceError>;
}

/// Error type for price source operations.
///
/// None of these abort a batch: the reconciler treats each one as "no data
/// this pass".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSourceError {
    /// No API token configured; no request was attempted.
    MissingCredentials,
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 401 bad token, 5xx server error)
    HttpError { status: u16, message: String },
    /// Response body was not valid JSON
    ParseError(String),
    /// Rate limit exceeded after retries
    RateLimited,
    /// Configured endpoint is not a valid URL
    InvalidUrl(String),
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceError::MissingCredentials => write!(f, "API token not configured"),
            DataSourceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            DataSourceError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            DataSourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            DataSourceError::RateLimited => write!(f, "Rate limited"),
            DataSourceError::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),
        }
    }
}

impl std::error::Error for DataSourceError {}
