//! Tracked position: one row of the tracking table.

use crate::domain::{Decimal, Symbol};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Number of calendar days tracked from the purchase date.
pub const DAYS_TRACKED: usize = 7;

/// Closing price and change for one tracked day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayEntry {
    pub price: Option<Decimal>,
    /// `(price - initial_price) / initial_price`, as a fraction.
    pub change_pct: Option<Decimal>,
}

/// A symbol monitored for seven days from its purchase date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedPosition {
    pub symbol: Symbol,
    /// Set once; defaults to the reference date on first reconciliation.
    pub purchase_date: Option<NaiveDate>,
    /// Set once from the first available opening price.
    pub initial_price: Option<Decimal>,
    /// Latest known close inside the window.
    pub end_price: Option<Decimal>,
    pub total_change_pct: Option<Decimal>,
    /// Day 1 is the purchase date, day 7 is six days later.
    pub days: [DayEntry; DAYS_TRACKED],
}

impl TrackedPosition {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            purchase_date: None,
            initial_price: None,
            end_price: None,
            total_change_pct: None,
            days: [DayEntry::default(); DAYS_TRACKED],
        }
    }

    pub fn with_purchase_date(mut self, date: NaiveDate) -> Self {
        self.purchase_date = Some(date);
        self
    }

    pub fn with_initial_price(mut self, price: Decimal) -> Self {
        self.initial_price = Some(price);
        self
    }

    /// A row is complete once the day-7 price is known; completion is terminal.
    pub fn is_complete(&self) -> bool {
        self.days[DAYS_TRACKED - 1].price.is_some()
    }

    /// Entry for a 1-based day number.
    ///
    /// # Panics
    /// Panics if `day_num` is not in `1..=7`.
    pub fn day(&self, day_num: usize) -> &DayEntry {
        &self.days[day_num - 1]
    }

    /// Mutable entry for a 1-based day number.
    ///
    /// # Panics
    /// Panics if `day_num` is not in `1..=7`.
    pub fn day_mut(&mut self, day_num: usize) -> &mut DayEntry {
        &mut self.days[day_num - 1]
    }

    /// Number of days with a recorded price.
    pub fn days_filled(&self) -> usize {
        self.days.iter().filter(|d| d.price.is_some()).count()
    }
}
