//! Lenient timestamp parsing and display formatting
//!
//! Backends disagree on timestamp shapes: RFC 3339 strings, space-separated datetimes
//! with or without an offset, bare dates, and epoch milliseconds. All of them are
//! resolved to `DateTime<Utc>` here; anything else is `None`.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, Offset, SecondsFormat, Utc};
use serde_json::Value;

/// Display settings for human-facing timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayOptions {
    /// Offset applied before formatting localized timestamps.
    pub utc_offset: FixedOffset,
}

impl DisplayOptions {
    /// Builds options from an offset in minutes east of UTC.
    ///
    /// Returns `None` when the offset is outside the range chrono accepts.
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        let utc_offset = FixedOffset::east_opt(minutes.checked_mul(60)?)?;
        Some(Self { utc_offset })
    }
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            utc_offset: Utc.fix(),
        }
    }
}

/// Parses a timestamp string in any of the accepted shapes.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    // ISO 8601 / RFC 3339 first (standard)
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f %z")
                .map(|dt| dt.with_timezone(&Utc))
        })
        .or_else(|_| {
            // Naive datetimes are taken as UTC
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
                .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
        })
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
        })
}

/// Interprets a JSON number as milliseconds since the Unix epoch.
pub fn from_epoch_millis(value: &Value) -> Option<DateTime<Utc>> {
    let millis = match value.as_i64() {
        Some(ms) => ms,
        None => {
            let f = value.as_f64()?;
            if !f.is_finite() || f.abs() > i64::MAX as f64 {
                return None;
            }
            f.trunc() as i64
        }
    };
    DateTime::<Utc>::from_timestamp_millis(millis)
}

/// Field matcher for timestamp-bearing fields: a parseable string or epoch milliseconds.
///
/// Instants outside years 0000-9999 are rejected since RFC 3339 cannot represent them.
pub fn timestamp_value(value: &Value) -> Option<DateTime<Utc>> {
    let instant = match value {
        Value::String(s) => parse_timestamp(s),
        Value::Number(_) => from_epoch_millis(value),
        _ => None,
    }?;
    (0..=9999).contains(&instant.year()).then_some(instant)
}

/// Canonical machine-readable form, e.g. `2024-03-01T09:30:00Z`.
pub fn format_iso(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Localized display form, e.g. `3/1/2024, 9:30:00 AM`.
pub fn format_localized(instant: &DateTime<Utc>, options: &DisplayOptions) -> String {
    instant
        .with_timezone(&options.utc_offset)
        .format("%-m/%-d/%Y, %-I:%M:%S %p")
        .to_string()
}
