//! Output formatting and persistence for query results.
//!
//! Supports pretty JSON (to a file or stdout) and CSV files.

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info};

use crate::normalize::Rejection;
use csv::WriterBuilder;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Flat CSV shape of a [`Rejection`].
#[derive(Debug, Serialize)]
struct RejectionRow<'a> {
    line: u64,
    reason: &'static str,
    detail: &'a str,
    date: Option<&'a str>,
    hour: Option<&'a str>,
    minute: Option<&'a str>,
    vehicle_class: Option<&'a str>,
    time_period: Option<&'a str>,
    region: Option<&'a str>,
    count: Option<&'a str>,
    excluded: Option<&'a str>,
}

impl<'a> From<&'a Rejection> for RejectionRow<'a> {
    fn from(r: &'a Rejection) -> Self {
        let raw = &r.record;
        RejectionRow {
            line: raw.line,
            reason: r.reason.code(),
            detail: &r.detail,
            date: raw.date.as_deref(),
            hour: raw.hour.as_deref(),
            minute: raw.minute.as_deref(),
            vehicle_class: raw.vehicle_class.as_deref(),
            time_period: raw.time_period.as_deref(),
            region: raw.region.as_deref(),
            count: raw.count.as_deref(),
            excluded: raw.excluded.as_deref(),
        }
    }
}

fn ensure_parent_dir(path: &str) -> Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Writes `value` as pretty-printed JSON to `path`, or to stdout when `path`
/// is `None`.
pub fn write_json(path: Option<&str>, value: &impl Serialize) -> Result<()> {
    let body = serde_json::to_string_pretty(value)?;
    match path {
        Some(path) => {
            ensure_parent_dir(path)?;
            fs::write(path, body)?;
            info!(path, "JSON written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", body)?;
        }
    }
    Ok(())
}

/// Writes `rows` to a new CSV file at `path`, replacing any existing file.
pub fn write_csv<T: Serialize>(path: &str, rows: &[T]) -> Result<()> {
    ensure_parent_dir(path)?;
    debug!(path, rows = rows.len(), "Writing CSV");

    let file = File::create(path)?;
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);

    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!(path, rows = rows.len(), "CSV written");
    Ok(())
}

/// Writes rejected rows, one per line with their reason, for operator review.
pub fn write_rejections(path: &str, rejections: &[Rejection]) -> Result<()> {
    let rows: Vec<RejectionRow> = rejections.iter().map(RejectionRow::from).collect();
    write_csv(path, &rows)
}
