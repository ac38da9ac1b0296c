//! Watermark ranges and bound resolution.
//!
//! A watermark describes what a job should cover: either a date-time span
//! or an ordered list of discrete values. Date-time bounds arrive as
//! strings and are resolved against "now" in a named time zone; see
//! [`resolve_bound`].

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::WatermarkError;

/// Date-time patterns tried, in order, for absolute bounds.
///
/// Extensible by construction order only; the final fallback reinterprets
/// the first 10 characters as `%Y-%m-%d`, so most inputs resolve to
/// something rather than erroring.
const DATETIME_PATTERNS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y%m%d%H%M%S",
];

/// A declared watermark range, before resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WatermarkRange {
    /// A date-time span with string bounds resolved at plan time.
    Datetime {
        /// Column or field the watermark tracks
        name: String,
        /// Low bound: absolute timestamp, `P\d+D[T\d+H]` duration, or `-`
        low: String,
        /// High bound, same forms as `low`
        high: String,
        /// Named tz-database zone used to resolve relative bounds
        #[serde(default = "default_zone")]
        zone: String,
    },
    /// An ordered list of discrete values, one work unit each.
    Unit {
        /// Column or field the watermark tracks
        name: String,
        /// Discrete values, in extraction order
        values: Vec<String>,
    },
}

fn default_zone() -> String {
    "UTC".to_string()
}

impl WatermarkRange {
    /// Name of the watermarked column or field.
    pub fn name(&self) -> &str {
        match self {
            WatermarkRange::Datetime { name, .. } => name,
            WatermarkRange::Unit { name, .. } => name,
        }
    }

    /// Resolve string bounds against the current instant.
    pub fn resolve(&self) -> Result<ResolvedWatermark, WatermarkError> {
        self.resolve_at(Utc::now())
    }

    /// Resolve string bounds against a fixed instant (deterministic).
    pub fn resolve_at(&self, now: DateTime<Utc>) -> Result<ResolvedWatermark, WatermarkError> {
        match self {
            WatermarkRange::Datetime {
                low, high, zone, ..
            } => {
                let tz: Tz = zone.parse().map_err(|_| WatermarkError::UnknownZone {
                    zone: zone.clone(),
                })?;
                Ok(ResolvedWatermark::Datetime(DatetimeRange {
                    from: resolve_bound(low, now, tz)?,
                    to: resolve_bound(high, now, tz)?,
                }))
            }
            WatermarkRange::Unit { values, .. } => Ok(ResolvedWatermark::Unit(values.clone())),
        }
    }
}

/// A watermark range with bounds resolved to concrete values.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedWatermark {
    Datetime(DatetimeRange),
    Unit(Vec<String>),
}

/// A resolved date-time span, `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatetimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DatetimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }
}

/// One bound of a work unit, carried into request parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WatermarkValue {
    Datetime(DateTime<Utc>),
    Unit(String),
}

impl WatermarkValue {
    /// Render the value for `{{name}}` substitution.
    ///
    /// Date-times use the given chrono format string; discrete values
    /// render verbatim.
    pub fn format(&self, datetime_format: &str) -> String {
        match self {
            WatermarkValue::Datetime(dt) => dt.format(datetime_format).to_string(),
            WatermarkValue::Unit(value) => value.clone(),
        }
    }
}

impl std::fmt::Display for WatermarkValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatermarkValue::Datetime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            WatermarkValue::Unit(value) => write!(f, "{}", value),
        }
    }
}

/// Resolve one bound string to an instant.
///
/// Three forms are accepted:
/// - `-`: "now", floored to the minute
/// - `P<days>D` or `P<days>DT<hours>H`: a duration back from now, floored
///   to the day or (when an hour component is present) the hour, in `zone`
/// - anything else: an absolute timestamp tried against
///   [`DATETIME_PATTERNS`], then the lenient first-10-characters
///   `%Y-%m-%d` fallback
pub fn resolve_bound(
    raw: &str,
    now: DateTime<Utc>,
    zone: Tz,
) -> Result<DateTime<Utc>, WatermarkError> {
    let raw = raw.trim();

    if raw == "-" {
        return floor_to_minute(now).ok_or_else(|| unparsable(raw));
    }

    // Relative duration expression.
    let duration_re = Regex::new(r"^P(\d+)D(?:T(\d+)H)?$").unwrap();
    if let Some(caps) = duration_re.captures(raw) {
        let days: i64 = caps[1].parse().map_err(|_| unparsable(raw))?;
        let hours: Option<i64> = caps
            .get(2)
            .map(|m| m.as_str().parse())
            .transpose()
            .map_err(|_| unparsable(raw))?;

        let local = now.with_timezone(&zone) - Duration::days(days)
            - Duration::hours(hours.unwrap_or(0));
        let floored = match hours {
            Some(_) => floor_to_hour(local),
            None => floor_to_day(local),
        };
        return floored
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| unparsable(raw));
    }

    // Absolute timestamp.
    for pattern in DATETIME_PATTERNS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, pattern) {
            return local_to_utc(naive, zone).ok_or_else(|| unparsable(raw));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return local_to_utc(midnight(date), zone).ok_or_else(|| unparsable(raw));
    }

    // Lenient fallback: reinterpret the leading characters as a plain date.
    let head: String = raw.chars().take(10).collect();
    let date = NaiveDate::parse_from_str(&head, "%Y-%m-%d").map_err(|_| unparsable(raw))?;
    local_to_utc(midnight(date), zone).ok_or_else(|| unparsable(raw))
}

fn unparsable(value: &str) -> WatermarkError {
    WatermarkError::UnparsableBound {
        value: value.to_string(),
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).expect("midnight is always valid")
}

fn local_to_utc(naive: NaiveDateTime, zone: Tz) -> Option<DateTime<Utc>> {
    zone.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

fn floor_to_minute(dt: DateTime<Utc>) -> Option<DateTime<Utc>> {
    dt.with_second(0)?.with_nanosecond(0)
}

fn floor_to_hour<T: TimeZone>(dt: DateTime<T>) -> Option<DateTime<T>> {
    dt.with_minute(0)?.with_second(0)?.with_nanosecond(0)
}

fn floor_to_day<T: TimeZone>(dt: DateTime<T>) -> Option<DateTime<T>> {
    floor_to_hour(dt)?.with_hour(0)
}
