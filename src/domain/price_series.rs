//! Date-indexed daily price lookup built per reconciliation call.

use crate::domain::{dates::format_date, Decimal};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Daily OHLCV observation; any field may be missing upstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBar {
    pub open: Option<Decimal>,
    pub close: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub volume: Option<u64>,
}

/// Price bars keyed by calendar date, iterated in ascending date order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceSeries {
    bars: BTreeMap<NaiveDate, PriceBar>,
}

impl PriceSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a bar, replacing any bar already present for that date.
    pub fn insert(&mut self, date: NaiveDate, bar: PriceBar) {
        self.bars.insert(date, bar);
    }

    pub fn with_bar(mut self, date: NaiveDate, bar: PriceBar) -> Self {
        self.insert(date, bar);
        self
    }

    pub fn get(&self, date: NaiveDate) -> Option<&PriceBar> {
        self.bars.get(&date)
    }

    pub fn open_on(&self, date: NaiveDate) -> Option<Decimal> {
        self.get(date).and_then(|b| b.open)
    }

    pub fn close_on(&self, date: NaiveDate) -> Option<Decimal> {
        self.get(date).and_then(|b| b.close)
    }

    /// Opening price of the earliest date that reports one.
    pub fn first_open(&self) -> Option<(NaiveDate, Decimal)> {
        self.bars
            .iter()
            .find_map(|(date, bar)| bar.open.map(|open| (*date, open)))
    }

    /// Earliest date in the series with its bar.
    pub fn first(&self) -> Option<(NaiveDate, &PriceBar)> {
        self.bars.iter().next().map(|(d, b)| (*d, b))
    }

    /// Latest date in the series with its bar.
    pub fn last(&self) -> Option<(NaiveDate, &PriceBar)> {
        self.bars.iter().next_back().map(|(d, b)| (*d, b))
    }

    /// Bars dated within `start..=end`.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> PriceSeries {
        if start > end {
            return PriceSeries::new();
        }
        PriceSeries {
            bars: self
                .bars
                .range(start..=end)
                .map(|(d, b)| (*d, *b))
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDate, &PriceBar)> {
        self.bars.iter()
    }

    /// `YYYY-MM-DD` keys in ascending order.
    pub fn date_keys(&self) -> Vec<String> {
        self.bars.keys().copied().map(format_date).collect()
    }

    /// Whether any bar carries an open or close price.
    pub fn has_prices(&self) -> bool {
        self.bars
            .values()
            .any(|bar| bar.open.is_some() || bar.close.is_some())
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn px(s: &str) -> Option<Decimal> {
        Some(Decimal::from_str_canonical(s).unwrap())
    }

    #[test]
    fn test_first_open_skips_dates_without_open() {
        let series = PriceSeries::new()
            .with_bar(date(6, 18), PriceBar { open: px("12"), close: px("13"), ..Default::default() })
            .with_bar(date(6, 17), PriceBar { open: None, close: px("10"), ..Default::default() });

        assert_eq!(series.first_open(), Some((date(6, 18), px("12").unwrap())));
        assert_eq!(series.first().map(|(d, _)| d), Some(date(6, 17)));
    }

    #[test]
    fn test_insert_replaces_existing_date() {
        let mut series = PriceSeries::new();
        series.insert(date(6, 16), PriceBar { close: px("1"), ..Default::default() });
        series.insert(date(6, 16), PriceBar { close: px("2"), ..Default::default() });
        assert_eq!(series.len(), 1);
        assert_eq!(series.close_on(date(6, 16)), px("2"));
    }

    #[test]
    fn test_between_is_inclusive() {
        let series = PriceSeries::new()
            .with_bar(date(6, 13), PriceBar::default())
            .with_bar(date(6, 16), PriceBar::default())
            .with_bar(date(6, 22), PriceBar::default())
            .with_bar(date(6, 23), PriceBar::default());
        let window = series.between(date(6, 16), date(6, 22));
        assert_eq!(window.date_keys(), vec!["2025-06-16", "2025-06-22"]);
        assert!(series.between(date(6, 22), date(6, 16)).is_empty());
    }

    #[test]
    fn test_has_prices_ignores_volume_only_bars() {
        let volume_only = PriceBar { volume: Some(100), ..Default::default() };
        let series = PriceSeries::new().with_bar(date(6, 16), volume_only);
        assert!(!series.has_prices());
        assert!(!PriceSeries::new().has_prices());

        let series = series.with_bar(date(6, 17), PriceBar { close: px("5"), ..Default::default() });
        assert!(series.has_prices());
    }

    #[test]
    fn test_date_keys_sorted() {
        let series = PriceSeries::new()
            .with_bar(date(6, 20), PriceBar::default())
            .with_bar(date(6, 16), PriceBar::default());
        assert_eq!(series.date_keys(), vec!["2025-06-16", "2025-06-20"]);
        assert_eq!(series.last().map(|(d, _)| d), Some(date(6, 20)));
    }
}
