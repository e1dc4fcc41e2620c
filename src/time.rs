//! # CF Time Decoding
//!
//! Temporal axes in CF-style datasets carry numeric offsets from an epoch
//! declared in the `units` attribute, e.g. `"hours since 1950-01-01"` or
//! `"seconds since 1970-01-01 00:00:00"`. This module parses those unit
//! strings and converts offsets into `chrono` timestamps.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Multiplier unit of a CF time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    fn seconds(&self) -> f64 {
        match self {
            TimeUnit::Seconds => 1.0,
            TimeUnit::Minutes => 60.0,
            TimeUnit::Hours => 3_600.0,
            TimeUnit::Days => 86_400.0,
        }
    }

    fn from_word(word: &str) -> Option<Self> {
        match word.trim_end_matches('s') {
            "second" | "sec" => Some(TimeUnit::Seconds),
            "minute" | "min" => Some(TimeUnit::Minutes),
            "hour" | "hr" | "h" => Some(TimeUnit::Hours),
            "day" | "d" => Some(TimeUnit::Days),
            _ => None,
        }
    }
}

/// A parsed CF time unit declaration: unit multiplier plus epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CfTimeBase {
    pub unit: TimeUnit,
    pub epoch: DateTime<Utc>,
}

impl CfTimeBase {
    /// Converts a raw axis offset into an absolute timestamp.
    pub fn timestamp(&self, offset: f64) -> DateTime<Utc> {
        let millis = (offset * self.unit.seconds() * 1_000.0).round() as i64;
        self.epoch + chrono::Duration::milliseconds(millis)
    }
}

/// Parses a CF `units` string of the form `"<unit> since <epoch>"`.
///
/// Returns `None` when the string does not follow the convention; the
/// classifier treats that as "not a time axis" rather than an error.
pub fn parse_cf_units(units: &str) -> Option<CfTimeBase> {
    let trimmed = units.trim();
    // The unit word is case-insensitive; the epoch keeps its spelling.
    let lower = trimmed.to_ascii_lowercase();
    let pos = lower.find(" since ")?;
    let unit = TimeUnit::from_word(lower[..pos].trim())?;
    let epoch = parse_epoch(trimmed[pos + " since ".len()..].trim())?;
    Some(CfTimeBase { unit, epoch })
}

/// Accepts the epoch spellings seen in the wild: a bare date, a date with
/// time, an optional `T` separator, an optional trailing `Z` or UTC offset.
fn parse_epoch(text: &str) -> Option<DateTime<Utc>> {
    let text = text
        .trim_end_matches(" UTC")
        .trim_end_matches(" utc")
        .trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    None
}

/// True when a `units` attribute declares a CF time axis.
pub fn is_time_units(units: &str) -> bool {
    parse_cf_units(units).is_some()
}
