//! Price series normalization.
//!
//! Turns whatever the provider sent back into a clean [`PriceSeries`].
//! Accepted shapes:
//! - a flat list of per-date records (`[{"date": ..., "open": ...}, ...]`)
//! - an envelope holding that list under `"data"`
//! - an already date-keyed object (`{"2025-06-16": {"open": ...}}`)
//! - any of the above encoded as a JSON string
//!
//! Anything else degrades to an empty series so one bad response never
//! aborts a batch.

use crate::domain::{parse_calendar_date, Decimal, PriceBar, PriceSeries};
use serde_json::{Map, Value};
use tracing::{debug, warn};

const ENVELOPE_KEY: &str = "data";

/// Normalize a raw provider payload.
pub fn normalize(raw: &Value) -> PriceSeries {
    match raw {
        Value::String(text) => normalize_str(text),
        Value::Array(records) => normalize_records(records),
        Value::Object(map) => match map.get(ENVELOPE_KEY) {
            Some(Value::Array(records)) => normalize_records(records),
            Some(other) => {
                warn!("Envelope '{}' is not a list ({}), ignoring payload", ENVELOPE_KEY, kind(other));
                PriceSeries::new()
            }
            None => normalize_date_keyed(map),
        },
        other => {
            warn!("Unsupported price payload ({}), treating as empty", kind(other));
            PriceSeries::new()
        }
    }
}

/// Normalize a payload given as JSON text.
pub fn normalize_str(text: &str) -> PriceSeries {
    match serde_json::from_str::<Value>(text) {
        // A string that decodes to another string is not a payload.
        Ok(Value::String(_)) => PriceSeries::new(),
        Ok(value) => normalize(&value),
        Err(e) => {
            warn!("Error parsing price payload: {}", e);
            PriceSeries::new()
        }
    }
}

fn normalize_records(records: &[Value]) -> PriceSeries {
    let mut series = PriceSeries::new();
    let mut dropped = 0usize;

    for record in records {
        let Some(fields) = record.as_object() else {
            dropped += 1;
            continue;
        };
        let Some(date) = fields
            .get("date")
            .and_then(Value::as_str)
            .and_then(parse_calendar_date)
        else {
            dropped += 1;
            continue;
        };
        // Later records for the same date replace earlier ones.
        series.insert(date, bar_from_fields(fields));
    }

    if dropped > 0 {
        debug!("Dropped {} price records without a usable date", dropped);
    }
    debug!("Parsed {} data points from price payload", series.len());
    series
}

fn normalize_date_keyed(map: &Map<String, Value>) -> PriceSeries {
    let mut series = PriceSeries::new();
    for (key, value) in map {
        let (Some(date), Some(fields)) = (parse_calendar_date(key), value.as_object()) else {
            continue;
        };
        series.insert(date, bar_from_fields(fields));
    }
    series
}

fn bar_from_fields(fields: &Map<String, Value>) -> PriceBar {
    let price = |name: &str| fields.get(name).and_then(Decimal::from_json);
    PriceBar {
        open: price("open"),
        close: price("close"),
        high: price("high"),
        low: price("low"),
        volume: fields.get("volume").and_then(parse_volume),
    }
}

fn parse_volume(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|v| v.is_finite() && *v >= 0.0)
                .map(|v| v.round() as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
