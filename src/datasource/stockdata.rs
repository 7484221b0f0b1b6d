//! StockData.org end-of-day API client.

use super::{DataSourceError, PriceSource};
use crate::credentials::ApiCredentials;
use crate::domain::format_date;
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use chrono::NaiveDate;
use reqwest::{Client, Url};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_STOCKDATA_URL: &str = "https://api.stockdata.org/v1/data/eod";

/// Transport limits for provider requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpSettings {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retries after the first attempt for transient failures.
    pub max_retries: u32,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

/// Price source backed by the StockData.org `data/eod` endpoint.
#[derive(Debug, Clone)]
pub struct StockDataSource {
    client: Client,
    base_url: String,
    credentials: ApiCredentials,
    settings: HttpSettings,
}

impl StockDataSource {
    pub fn new(base_url: String, credentials: ApiCredentials, settings: HttpSettings) -> Self {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url,
            credentials,
            settings,
        }
    }

    /// Create with the public StockData.org endpoint and default transport limits.
    pub fn default_url(credentials: ApiCredentials) -> Self {
        Self::new(
            DEFAULT_STOCKDATA_URL.to_string(),
            credentials,
            HttpSettings::default(),
        )
    }

    /// Build the request URL for a symbol and window.
    pub fn request_url(
        &self,
        symbol: &str,
        date_from: NaiveDate,
        date_to: Option<NaiveDate>,
        token: &str,
    ) -> Result<Url, DataSourceError> {
        let mut params = vec![
            ("symbols", symbol.to_string()),
            ("date_from", format_date(date_from)),
        ];
        if let Some(to) = date_to {
            params.push(("date_to", format_date(to)));
        }
        params.push(("api_token", token.to_string()));

        Url::parse_with_params(&self.base_url, &params)
            .map_err(|e| DataSourceError::InvalidUrl(format!("{}: {}", self.base_url, e)))
    }

    /// The request URL with the token replaced, safe to log.
    pub fn redacted_url(url: &Url) -> String {
        let mut safe = url.clone();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| {
                let v = if k == "api_token" {
                    "[HIDDEN]".to_string()
                } else {
                    v.into_owned()
                };
                (k.into_owned(), v)
            })
            .collect();
        safe.query_pairs_mut().clear().extend_pairs(pairs);
        safe.to_string()
    }

    async fn get_json(&self, url: &Url) -> Result<serde_json::Value, DataSourceError> {
        let backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(500),
            max_elapsed_time: Some(self.settings.timeout * (self.settings.max_retries + 1)),
            ..Default::default()
        };

        let client = &self.client;
        let max_retries = self.settings.max_retries;
        let attempts = AtomicU32::new(0);
        let attempts = &attempts;

        retry(backoff, move || async move {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            // Once retries are spent a transient failure becomes final.
            let transient = |err: DataSourceError| {
                if attempt < max_retries {
                    warn!("Attempt {} failed: {}, retrying", attempt + 1, err);
                    backoff::Error::transient(err)
                } else {
                    backoff::Error::permanent(err)
                }
            };

            let response = client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| transient(DataSourceError::NetworkError(e.to_string())))?;

            let status = response.status();
            if status == 429 {
                return Err(transient(DataSourceError::RateLimited));
            }
            if status.is_server_error() {
                return Err(transient(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            debug!("API response received - Status: {}", status);
            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| backoff::Error::permanent(DataSourceError::ParseError(e.to_string())))
        })
        .await
    }
}

#[async_trait]
impl PriceSource for StockDataSource {
    async fn fetch_prices(
        &self,
        symbol: &str,
        date_from: NaiveDate,
        date_to: Option<NaiveDate>,
    ) -> Result<serde_json::Value, DataSourceError> {
        let Some(token) = self.credentials.stockdata_token() else {
            return Err(DataSourceError::MissingCredentials);
        };

        let url = self.request_url(symbol, date_from, date_to, token)?;
        info!(
            "Fetching {} from {} to {}: {}",
            symbol,
            date_from,
            date_to.map(format_date).unwrap_or_else(|| "latest".to_string()),
            Self::redacted_url(&url)
        );

        self.get_json(&url).await
    }
}
