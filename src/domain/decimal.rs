//! Lossless decimal price type backed by rust_decimal.
//!
//! Prices arrive from the provider as JSON numbers or strings and are parsed
//! through their textual form so no binary floating-point drift creeps into
//! the stored figures.

use rust_decimal::Decimal as RustDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Decimal price or fraction.
///
/// Serializes to a JSON number (not a string).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Decimal(#[serde(with = "rust_decimal::serde::float")] RustDecimal);

impl Decimal {
    /// Parse a Decimal from a string losslessly.
    ///
    /// Accepts plain and scientific notation (`"1.5e2"`).
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        let trimmed = s.trim();
        RustDecimal::from_str(trimmed)
            .or_else(|_| RustDecimal::from_scientific(trimmed))
            .map(Decimal)
    }

    /// Parse a JSON value holding either a number or a numeric string.
    ///
    /// `null`, booleans, objects and unparseable strings yield `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => Self::from_str_canonical(&n.to_string()).ok(),
            serde_json::Value::String(s) if !s.trim().is_empty() => {
                Self::from_str_canonical(s).ok()
            }
            _ => None,
        }
    }

    /// Format without exponent notation and without trailing zeros.
    pub fn to_canonical_string(&self) -> String {
        format!("{}", self.0.normalize())
    }

    pub fn zero() -> Self {
        Decimal(RustDecimal::ZERO)
    }

    /// Division that returns `None` instead of panicking on a zero divisor
    /// or overflow.
    pub fn checked_div(self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_div(rhs.0).map(Decimal)
    }

    /// Relative change from `base` to `self` as a fraction: `(self - base) / base`.
    ///
    /// Returns `None` when `base` is zero.
    pub fn fraction_change_from(self, base: Decimal) -> Option<Decimal> {
        (self - base).checked_div(base)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl std::ops::Sub for Decimal {
    type Output = Decimal;

    fn sub(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 - rhs.0)
    }
}
