//! Per-row reconciliation of a tracked position against daily prices.

use crate::datasource::{DataSourceError, PriceSource};
use crate::domain::{Decimal, PriceSeries, TrackedPosition, DAYS_TRACKED};
use crate::engine::normalizer::normalize;
use chrono::{Duration, NaiveDate};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Inclusive date range queried for a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Window {
    /// `[purchase_date, min(purchase_date + 6 days, reference_date)]`.
    ///
    /// Returns `None` when the purchase date lies after the reference date.
    pub fn compute(purchase_date: NaiveDate, reference_date: NaiveDate) -> Option<Self> {
        if purchase_date > reference_date {
            return None;
        }
        let last_tracked = purchase_date + Duration::days(DAYS_TRACKED as i64 - 1);
        Some(Self {
            start: purchase_date,
            end: last_tracked.min(reference_date),
        })
    }

    /// Number of calendar days covered, at most seven.
    pub fn days_tracked(&self) -> usize {
        let days = (self.end - self.start).num_days() + 1;
        (days.max(0) as usize).min(DAYS_TRACKED)
    }
}

/// Why a row was left untouched this pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferReason {
    /// Purchase date is after the reference date.
    PurchaseDateInFuture,
    /// The source failed; the row retries on a later pass.
    FetchFailed(DataSourceError),
    /// The source answered without an open or close price inside the window.
    NoData,
}

impl fmt::Display for DeferReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeferReason::PurchaseDateInFuture => write!(f, "purchase date is in the future"),
            DeferReason::FetchFailed(e) => write!(f, "fetch failed: {}", e),
            DeferReason::NoData => write!(f, "no data in window"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Day 7 was already priced; nothing fetched.
    AlreadyComplete,
    Deferred(DeferReason),
    Updated { days_filled: usize },
}

/// Result of reconciling one row: the row to store plus what happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub row: TrackedPosition,
    pub outcome: ReconcileOutcome,
}

/// Fills tracked positions from a price source, one row at a time.
#[derive(Debug, Clone)]
pub struct Reconciler {
    source: Arc<dyn PriceSource>,
}

impl Reconciler {
    pub fn new(source: Arc<dyn PriceSource>) -> Self {
        Self { source }
    }

    /// Reconcile `row` as of `reference_date`.
    ///
    /// Never fails: every problem turns into a deferred outcome. The input
    /// row is not mutated; callers replace it with the returned row.
    pub async fn reconcile(
        &self,
        row: &TrackedPosition,
        reference_date: NaiveDate,
    ) -> Reconciliation {
        let symbol = row.symbol.as_str();

        if row.is_complete() {
            info!("Skipping update for {} - already completed", symbol);
            return Reconciliation {
                row: row.clone(),
                outcome: ReconcileOutcome::AlreadyComplete,
            };
        }

        let mut base = row.clone();
        let purchase_date = *base.purchase_date.get_or_insert_with(|| {
            info!("Set purchase date for {} to {}", symbol, reference_date);
            reference_date
        });

        let Some(window) = Window::compute(purchase_date, reference_date) else {
            return defer(base, DeferReason::PurchaseDateInFuture);
        };

        let raw = match self
            .source
            .fetch_prices(symbol, window.start, Some(window.end))
            .await
        {
            Ok(raw) => raw,
            Err(e) => return defer(base, DeferReason::FetchFailed(e)),
        };

        let series = normalize(&raw).between(window.start, window.end);
        if !series.has_prices() {
            return defer(base, DeferReason::NoData);
        }

        let updated = apply_series(&base, window, &series, reference_date);
        info!(
            "{}: initial={} end={} change={}",
            symbol,
            show(updated.initial_price),
            show(updated.end_price),
            show(updated.total_change_pct),
        );
        let days_filled = updated.days_filled();
        Reconciliation {
            row: updated,
            outcome: ReconcileOutcome::Updated { days_filled },
        }
    }
}

fn defer(row: TrackedPosition, reason: DeferReason) -> Reconciliation {
    warn!("Deferring {}: {}", row.symbol, reason);
    Reconciliation {
        row,
        outcome: ReconcileOutcome::Deferred(reason),
    }
}

fn show(value: Option<Decimal>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Initial price for a purchase date.
///
/// Preference: open on the purchase date, then the first open anywhere in
/// the series, then the close of the earliest date.
pub fn derive_initial_price(series: &PriceSeries, purchase_date: NaiveDate) -> Option<Decimal> {
    series
        .open_on(purchase_date)
        .or_else(|| series.first_open().map(|(_, open)| open))
        .or_else(|| series.first().and_then(|(_, bar)| bar.close))
}

/// Fill a row from a window's price series.
///
/// `row.purchase_date` must equal `window.start`. Days after
/// `reference_date` are never touched, nor is an existing initial price.
pub fn apply_series(
    row: &TrackedPosition,
    window: Window,
    series: &PriceSeries,
    reference_date: NaiveDate,
) -> TrackedPosition {
    let mut next = row.clone();
    let purchase_date = window.start;

    if next.initial_price.is_none() {
        next.initial_price = derive_initial_price(series, purchase_date);
    }
    let initial = next.initial_price;

    let mut previous: Option<Decimal> = None;
    let mut last_price: Option<Decimal> = None;

    for day_num in 1..=window.days_tracked() {
        let target = purchase_date + Duration::days(day_num as i64 - 1);
        if target > reference_date {
            continue;
        }

        let fallback = if day_num == 1 { initial } else { previous };
        if let Some(price) = series.close_on(target).or(fallback) {
            let entry = next.day_mut(day_num);
            entry.price = Some(price);
            entry.change_pct = initial.and_then(|base| price.fraction_change_from(base));
        }

        previous = next.day(day_num).price;
        if previous.is_some() {
            last_price = previous;
        }
    }

    if let Some(end) = last_price {
        next.end_price = Some(end);
        next.total_change_pct = initial.and_then(|base| end.fraction_change_from(base));
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MockPriceSource;
    use crate::domain::{DayEntry, PriceBar, Symbol};
    use serde_json::json;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn bar(open: Option<&str>, close: Option<&str>) -> PriceBar {
        PriceBar {
            open: open.map(d),
            close: close.map(d),
            ..Default::default()
        }
    }

    #[test]
    fn test_window_capped_at_seven_days() {
        let w = Window::compute(date(6, 2), date(6, 30)).unwrap();
        assert_eq!(w.end, date(6, 8));
        assert_eq!(w.days_tracked(), 7);
    }

    #[test]
    fn test_window_capped_at_reference_date() {
        let w = Window::compute(date(6, 16), date(6, 18)).unwrap();
        assert_eq!(w.end, date(6, 18));
        assert_eq!(w.days_tracked(), 3);

        let same_day = Window::compute(date(6, 16), date(6, 16)).unwrap();
        assert_eq!(same_day.days_tracked(), 1);
    }

    #[test]
    fn test_window_bounds_hold_across_range() {
        let purchase = date(6, 10);
        for offset in 0..20 {
            let reference = purchase + Duration::days(offset);
            let w = Window::compute(purchase, reference).unwrap();
            assert!(w.start <= w.end);
            assert!(w.end <= reference);
            assert!(w.end <= purchase + Duration::days(6));
        }
        assert!(Window::compute(date(6, 20), date(6, 19)).is_none());
    }

    #[test]
    fn test_initial_price_prefers_open_on_purchase_date() {
        let series = PriceSeries::new()
            .with_bar(date(6, 16), bar(Some("99"), Some("100")))
            .with_bar(date(6, 17), bar(Some("101"), Some("102")));
        assert_eq!(derive_initial_price(&series, date(6, 17)), Some(d("101")));
    }

    #[test]
    fn test_initial_price_first_available_open() {
        let series = PriceSeries::new()
            .with_bar(date(6, 17), bar(None, Some("10")))
            .with_bar(date(6, 18), bar(Some("12"), Some("13")));
        assert_eq!(derive_initial_price(&series, date(6, 17)), Some(d("12")));
    }

    #[test]
    fn test_initial_price_falls_back_to_first_close() {
        let series = PriceSeries::new()
            .with_bar(date(6, 17), bar(None, Some("10")))
            .with_bar(date(6, 18), bar(None, Some("13")));
        assert_eq!(derive_initial_price(&series, date(6, 17)), Some(d("10")));
    }

    #[test]
    fn test_forward_fill_uses_previous_day() {
        let series = PriceSeries::new()
            .with_bar(date(6, 16), bar(Some("100"), Some("101")))
            .with_bar(date(6, 17), bar(Some("101"), Some("102")))
            .with_bar(date(6, 19), bar(Some("103"), Some("110")));
        let row = TrackedPosition::new(Symbol::new("XYZ")).with_purchase_date(date(6, 16));
        let window = Window::compute(date(6, 16), date(6, 19)).unwrap();

        let out = apply_series(&row, window, &series, date(6, 19));
        assert_eq!(out.day(3).price, Some(d("102")));
        assert_eq!(out.day(3).change_pct, Some(d("0.02")));
        assert_eq!(out.day(4).price, Some(d("110")));
        assert_eq!(out.end_price, Some(d("110")));
    }

    #[test]
    fn test_day_one_missing_uses_initial_price() {
        // Purchase on a Saturday: no bar until Monday.
        let series = PriceSeries::new().with_bar(date(6, 16), bar(Some("50"), Some("55")));
        let row = TrackedPosition::new(Symbol::new("XYZ")).with_purchase_date(date(6, 14));
        let window = Window::compute(date(6, 14), date(6, 16)).unwrap();

        let out = apply_series(&row, window, &series, date(6, 16));
        assert_eq!(out.initial_price, Some(d("50")));
        assert_eq!(out.day(1).price, Some(d("50")));
        assert_eq!(out.day(1).change_pct, Some(d("0")));
        assert_eq!(out.day(2).price, Some(d("50")));
        assert_eq!(out.day(3).price, Some(d("55")));
        assert_eq!(out.day(3).change_pct, Some(d("0.1")));
        assert_eq!(out.day(4).price, None);
    }

    #[test]
    fn test_existing_initial_price_kept() {
        let series = PriceSeries::new().with_bar(date(6, 16), bar(Some("100"), Some("120")));
        let row = TrackedPosition::new(Symbol::new("XYZ"))
            .with_purchase_date(date(6, 16))
            .with_initial_price(d("80"));
        let window = Window::compute(date(6, 16), date(6, 16)).unwrap();

        let out = apply_series(&row, window, &series, date(6, 16));
        assert_eq!(out.initial_price, Some(d("80")));
        assert_eq!(out.day(1).change_pct, Some(d("0.5")));
        assert_eq!(out.total_change_pct, Some(d("0.5")));
    }

    #[test]
    fn test_zero_initial_price_yields_absent_change() {
        let series = PriceSeries::new().with_bar(date(6, 16), bar(Some("0"), Some("3")));
        let row = TrackedPosition::new(Symbol::new("XYZ")).with_purchase_date(date(6, 16));
        let window = Window::compute(date(6, 16), date(6, 16)).unwrap();

        let out = apply_series(&row, window, &series, date(6, 16));
        assert_eq!(out.initial_price, Some(d("0")));
        assert_eq!(out.day(1).price, Some(d("3")));
        assert_eq!(out.day(1).change_pct, None);
        assert_eq!(out.end_price, Some(d("3")));
        assert_eq!(out.total_change_pct, None);
    }

    #[test]
    fn test_absent_initial_price_yields_absent_change() {
        let series = PriceSeries::new().with_bar(date(6, 16), bar(None, None));
        let row = TrackedPosition::new(Symbol::new("XYZ")).with_purchase_date(date(6, 16));
        let window = Window::compute(date(6, 16), date(6, 17)).unwrap();

        let out = apply_series(&row, window, &series, date(6, 17));
        assert_eq!(out.initial_price, None);
        assert_eq!(*out.day(1), DayEntry::default());
        assert_eq!(out.end_price, None);
        assert_eq!(out.total_change_pct, None);
    }

    #[tokio::test]
    async fn test_reconcile_end_to_end_partial_week() {
        let source = MockPriceSource::new().with_payload(
            "XYZ",
            json!([
                {"date": "2025-06-16", "open": 100, "close": 102},
                {"date": "2025-06-17", "open": 103, "close": 101},
                {"date": "2025-06-18", "open": 101, "close": 105}
            ]),
        );
        let reconciler = Reconciler::new(Arc::new(source.clone()));
        let row = TrackedPosition::new(Symbol::new("XYZ")).with_purchase_date(date(6, 16));

        let result = reconciler.reconcile(&row, date(6, 18)).await;
        assert_eq!(result.outcome, ReconcileOutcome::Updated { days_filled: 3 });

        let out = result.row;
        assert_eq!(out.initial_price, Some(d("100")));
        assert_eq!(out.day(1).price, Some(d("102")));
        assert_eq!(out.day(1).change_pct, Some(d("0.02")));
        assert_eq!(out.day(2).price, Some(d("101")));
        assert_eq!(out.day(2).change_pct, Some(d("0.01")));
        assert_eq!(out.day(3).price, Some(d("105")));
        assert_eq!(out.day(3).change_pct, Some(d("0.05")));
        assert_eq!(out.end_price, Some(d("105")));
        assert_eq!(out.total_change_pct, Some(d("0.05")));
        for n in 4..=7 {
            assert_eq!(out.day(n).price, None);
        }

        let calls = source.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].date_from, date(6, 16));
        assert_eq!(calls[0].date_to, Some(date(6, 18)));
    }

    #[tokio::test]
    async fn test_reconcile_complete_row_is_noop() {
        let source = MockPriceSource::new()
            .with_payload("XYZ", json!([{"date": "2025-06-16", "open": 1, "close": 1}]));
        let reconciler = Reconciler::new(Arc::new(source.clone()));

        let mut row = TrackedPosition::new(Symbol::new("XYZ")).with_purchase_date(date(6, 16));
        row.day_mut(7).price = Some(d("42"));

        let result = reconciler.reconcile(&row, date(6, 30)).await;
        assert_eq!(result.outcome, ReconcileOutcome::AlreadyComplete);
        assert_eq!(result.row, row);
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn test_reconcile_defaults_purchase_date_and_defers_on_empty() {
        let source = MockPriceSource::new();
        let reconciler = Reconciler::new(Arc::new(source));
        let row = TrackedPosition::new(Symbol::new("NEW"));

        let result = reconciler.reconcile(&row, date(6, 18)).await;
        assert_eq!(result.outcome, ReconcileOutcome::Deferred(DeferReason::NoData));

        let mut expected = row.clone();
        expected.purchase_date = Some(date(6, 18));
        assert_eq!(result.row, expected);
    }

    #[tokio::test]
    async fn test_reconcile_fetch_failure_defers() {
        let source = MockPriceSource::new().with_failure("XYZ", DataSourceError::MissingCredentials);
        let reconciler = Reconciler::new(Arc::new(source));
        let row = TrackedPosition::new(Symbol::new("XYZ")).with_purchase_date(date(6, 16));

        let result = reconciler.reconcile(&row, date(6, 18)).await;
        assert_eq!(
            result.outcome,
            ReconcileOutcome::Deferred(DeferReason::FetchFailed(DataSourceError::MissingCredentials))
        );
        assert_eq!(result.row, row);
    }

    #[tokio::test]
    async fn test_reconcile_ignores_bars_outside_window() {
        let source = MockPriceSource::new().with_payload(
            "XYZ",
            json!([{"date": "2025-06-13", "open": 90, "close": 91}]),
        );
        let reconciler = Reconciler::new(Arc::new(source));
        let row = TrackedPosition::new(Symbol::new("XYZ")).with_purchase_date(date(6, 16));

        let result = reconciler.reconcile(&row, date(6, 18)).await;
        assert_eq!(result.outcome, ReconcileOutcome::Deferred(DeferReason::NoData));
        assert_eq!(result.row, row);
    }

    #[tokio::test]
    async fn test_reconcile_volume_only_bars_defer() {
        let source = MockPriceSource::new()
            .with_payload("XYZ", json!([{"date": "2025-06-16", "volume": 100}]));
        let reconciler = Reconciler::new(Arc::new(source));
        let row = TrackedPosition::new(Symbol::new("XYZ")).with_purchase_date(date(6, 16));

        let result = reconciler.reconcile(&row, date(6, 16)).await;
        assert_eq!(result.outcome, ReconcileOutcome::Deferred(DeferReason::NoData));
        assert_eq!(result.row, row);
    }

    #[tokio::test]
    async fn test_reconcile_future_purchase_date_skips_fetch() {
        let source = MockPriceSource::new();
        let reconciler = Reconciler::new(Arc::new(source.clone()));
        let row = TrackedPosition::new(Symbol::new("XYZ")).with_purchase_date(date(7, 1));

        let result = reconciler.reconcile(&row, date(6, 18)).await;
        assert_eq!(
            result.outcome,
            ReconcileOutcome::Deferred(DeferReason::PurchaseDateInFuture)
        );
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn test_reconcile_full_week_completes_row() {
        let records: Vec<_> = (16..=22)
            .map(|day| json!({"date": format!("2025-06-{}", day), "open": 100, "close": 100 + day - 15}))
            .collect();
        let source = MockPriceSource::new().with_payload("XYZ", serde_json::Value::Array(records));
        let reconciler = Reconciler::new(Arc::new(source));
        let row = TrackedPosition::new(Symbol::new("XYZ")).with_purchase_date(date(6, 16));

        let result = reconciler.reconcile(&row, date(6, 25)).await;
        assert!(result.row.is_complete());
        assert_eq!(result.row.day(7).price, Some(d("107")));
        assert_eq!(result.row.end_price, Some(d("107")));
        assert_eq!(result.row.total_change_pct, Some(d("0.07")));
    }
}
