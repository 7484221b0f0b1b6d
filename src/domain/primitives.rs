//! Domain primitives: Symbol and the reference-clock offset.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

/// Hours east of UTC that define "today" for a reconciliation pass.
///
/// This is a fixed business offset, not a timezone: no DST is applied.
pub const DEFAULT_REFERENCE_UTC_OFFSET_HOURS: i32 = -5;

/// Ticker symbol (e.g., "AAPL", "META").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol(pub String);

impl Symbol {
    /// Create a Symbol, trimming surrounding whitespace.
    pub fn new(symbol: impl Into<String>) -> Self {
        Symbol(symbol.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed UTC offset used to derive the reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceClock {
    offset: FixedOffset,
}

impl ReferenceClock {
    /// Build a clock from whole hours east of UTC.
    ///
    /// Returns `None` when the offset is outside `-23..=23`.
    pub fn from_offset_hours(hours: i32) -> Option<Self> {
        if !(-23..=23).contains(&hours) {
            return None;
        }
        FixedOffset::east_opt(hours * 3600).map(|offset| Self { offset })
    }

    /// Calendar date at `now` in the clock's offset; time of day is discarded.
    pub fn date_at(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.offset).date_naive()
    }

    /// Today's reference date.
    pub fn today(&self) -> NaiveDate {
        self.date_at(Utc::now())
    }
}

impl Default for ReferenceClock {
    fn default() -> Self {
        let offset = FixedOffset::east_opt(DEFAULT_REFERENCE_UTC_OFFSET_HOURS * 3600)
            .unwrap_or_else(|| Utc.fix());
        Self { offset }
    }
}
