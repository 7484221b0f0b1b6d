//! Mock price source for testing without network calls.

use super::{DataSourceError, PriceSource};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One recorded `fetch_prices` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCall {
    pub symbol: String,
    pub date_from: NaiveDate,
    pub date_to: Option<NaiveDate>,
}

/// Mock price source that returns canned payloads per symbol.
///
/// Symbols without a payload or failure get an empty list. Clones share
/// the call log.
#[derive(Debug, Clone, Default)]
pub struct MockPriceSource {
    payloads: HashMap<String, serde_json::Value>,
    failures: HashMap<String, DataSourceError>,
    calls: Arc<Mutex<Vec<FetchCall>>>,
}

impl MockPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `payload` verbatim for `symbol`.
    pub fn with_payload(mut self, symbol: &str, payload: serde_json::Value) -> Self {
        self.payloads.insert(symbol.to_string(), payload);
        self
    }

    /// Fail every fetch for `symbol` with `error`.
    pub fn with_failure(mut self, symbol: &str, error: DataSourceError) -> Self {
        self.failures.insert(symbol.to_string(), error);
        self
    }

    /// Calls received so far, in order.
    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }
}

#[async_trait]
impl PriceSource for MockPriceSource {
    async fn fetch_prices(
        &self,
        symbol: &str,
        date_from: NaiveDate,
        date_to: Option<NaiveDate>,
    ) -> Result<serde_json::Value, DataSourceError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(FetchCall {
                symbol: symbol.to_string(),
                date_from,
                date_to,
            });
        }

        if let Some(err) = self.failures.get(symbol) {
            return Err(err.clone());
        }
        Ok(self
            .payloads
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| serde_json::Value::Array(Vec::new())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    #[tokio::test]
    async fn test_mock_returns_payload_and_records_call() {
        let payload = json!({"data": [{"date": "2025-06-16", "close": 1}]});
        let mock = MockPriceSource::new().with_payload("XYZ", payload.clone());

        let got = mock.fetch_prices("XYZ", date(16), Some(date(18))).await.unwrap();
        assert_eq!(got, payload);
        assert_eq!(
            mock.calls(),
            vec![FetchCall {
                symbol: "XYZ".to_string(),
                date_from: date(16),
                date_to: Some(date(18)),
            }]
        );
    }

    #[tokio::test]
    async fn test_mock_unknown_symbol_is_empty() {
        let mock = MockPriceSource::new();
        let got = mock.fetch_prices("ABC", date(16), None).await.unwrap();
        assert_eq!(got, json!([]));
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let mock = MockPriceSource::new().with_failure("ABC", DataSourceError::RateLimited);
        let err = mock.fetch_prices("ABC", date(16), None).await.unwrap_err();
        assert_eq!(err, DataSourceError::RateLimited);

        let cloned = mock.clone();
        assert_eq!(cloned.call_count(), 1);
    }
}
