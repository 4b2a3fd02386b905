//! Raw row → [`NormalizedRecord`] conversion.
//!
//! This is the only place rows are discarded. Every discarded row comes back
//! as a [`Rejection`] with its reason; nothing is dropped silently.

use crate::entry_points::EntryPointTable;
use crate::records::{NormalizedRecord, RawEntryRecord};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

/// Why a row was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    MalformedTimestamp,
    InvalidCount,
    UnmappedLocation,
}

impl RejectReason {
    pub fn code(self) -> &'static str {
        match self {
            RejectReason::MalformedTimestamp => "MALFORMED_TIMESTAMP",
            RejectReason::InvalidCount => "INVALID_COUNT",
            RejectReason::UnmappedLocation => "UNMAPPED_LOCATION",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A rejected row, its reason, and a human-readable detail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub record: RawEntryRecord,
    pub reason: RejectReason,
    pub detail: String,
}

/// Output of [`normalize`].
#[derive(Debug, Clone, Default)]
pub struct NormalizeOutcome {
    pub normalized: Vec<NormalizedRecord>,
    pub rejected: Vec<Rejection>,
}

impl NormalizeOutcome {
    /// Number of rejections carrying `reason`.
    pub fn rejected_with(&self, reason: RejectReason) -> usize {
        self.rejected.iter().filter(|r| r.reason == reason).count()
    }
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Parses the date cell. A trailing time part (`01/05/2025 12:00:00 AM`) is
/// ignored; the hour and minute columns decide the time of day.
fn parse_date(value: &str) -> Option<NaiveDate> {
    let date_part = value.split_whitespace().next()?;
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

fn parse_timestamp(raw: &RawEntryRecord) -> Result<NaiveDateTime, String> {
    let date_cell = raw.date.as_deref().ok_or("date is missing")?;
    let date = parse_date(date_cell).ok_or_else(|| format!("unparseable date '{}'", date_cell))?;

    let hour_cell = raw.hour.as_deref().ok_or("hour is missing")?;
    let hour: u32 = hour_cell
        .parse()
        .map_err(|_| format!("unparseable hour '{}'", hour_cell))?;

    let minute: u32 = match raw.minute.as_deref() {
        Some(cell) => cell
            .parse()
            .map_err(|_| format!("unparseable minute block '{}'", cell))?,
        None => 0,
    };

    let time = NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| format!("time {}:{} out of range", hour, minute))?;
    Ok(date.and_time(time))
}

/// Coerces count text to a non-negative integer. Integral decimals such as
/// `"10.0"` are accepted.
fn parse_count(value: &str) -> Option<u64> {
    if let Ok(n) = value.parse::<u64>() {
        return Some(n);
    }
    let f: f64 = value.parse().ok()?;
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 {
        Some(f as u64)
    } else {
        None
    }
}

/// Normalizes one row, or says why it cannot be.
///
/// Checks run in order: timestamp, count, location.
pub fn normalize_record(
    raw: &RawEntryRecord,
    entry_points: &EntryPointTable,
) -> Result<NormalizedRecord, (RejectReason, String)> {
    let timestamp =
        parse_timestamp(raw).map_err(|detail| (RejectReason::MalformedTimestamp, detail))?;

    let count_cell = raw
        .count
        .as_deref()
        .ok_or((RejectReason::InvalidCount, "count is missing".to_string()))?;
    let entry_count = parse_count(count_cell).ok_or_else(|| {
        (
            RejectReason::InvalidCount,
            format!("'{}' is not a non-negative integer", count_cell),
        )
    })?;

    let region = raw.region.as_deref().unwrap_or_default();
    let location = entry_points.get(region).ok_or_else(|| {
        (
            RejectReason::UnmappedLocation,
            format!("no entry point named '{}'", region),
        )
    })?;

    let excluded_count = raw.excluded.as_deref().and_then(parse_count).unwrap_or(0);

    Ok(NormalizedRecord {
        timestamp,
        vehicle_class: raw.vehicle_class.clone().unwrap_or_default(),
        time_period: raw.time_period.clone(),
        region: region.to_string(),
        location,
        entry_count,
        excluded_count,
    })
}

/// Splits raw rows into normalized records and rejections.
///
/// Row-level problems never abort the batch. Output order follows input order.
pub fn normalize(raw_records: &[RawEntryRecord], entry_points: &EntryPointTable) -> NormalizeOutcome {
    let mut outcome = NormalizeOutcome::default();

    for raw in raw_records {
        match normalize_record(raw, entry_points) {
            Ok(record) => outcome.normalized.push(record),
            Err((reason, detail)) => {
                debug!(line = raw.line, reason = %reason, detail = %detail, "Row rejected");
                outcome.rejected.push(Rejection {
                    record: raw.clone(),
                    reason,
                    detail,
                });
            }
        }
    }

    info!(
        rows = raw_records.len(),
        normalized = outcome.normalized.len(),
        rejected = outcome.rejected.len(),
        malformed_timestamp = outcome.rejected_with(RejectReason::MalformedTimestamp),
        invalid_count = outcome.rejected_with(RejectReason::InvalidCount),
        unmapped_location = outcome.rejected_with(RejectReason::UnmappedLocation),
        "Normalization complete"
    );

    outcome
}
