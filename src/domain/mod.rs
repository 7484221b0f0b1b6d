//! Domain types for the stock tracking table.
//!
//! This module provides:
//! - Lossless numeric handling via the Decimal wrapper
//! - Calendar-date parsing and the fixed-offset reference clock
//! - TrackedPosition rows and the date-indexed PriceSeries

pub mod dates;
pub mod decimal;
pub mod position;
pub mod price_series;
pub mod primitives;

pub use dates::{format_date, parse_calendar_date};
pub use decimal::Decimal;
pub use position::{DayEntry, TrackedPosition, DAYS_TRACKED};
pub use price_series::{PriceBar, PriceSeries};
pub use primitives::{ReferenceClock, Symbol, DEFAULT_REFERENCE_UTC_OFFSET_HOURS};
