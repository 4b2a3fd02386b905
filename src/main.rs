//! CLI entry point for the CRZ heatmap engine.
//!
//! Loads an entries CSV, normalizes it against the entry-point table, and
//! answers heatmap, time-slider, marker, summary, and daily-rollup queries.

use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::{Args, Parser, Subcommand};
use crz_heatmap::analyzers::aggregate::location_totals;
use crz_heatmap::analyzers::daily::daily_rollup;
use crz_heatmap::analyzers::engine::QueryEngine;
use crz_heatmap::analyzers::granularity::Granularity;
use crz_heatmap::analyzers::summary::summarize;
use crz_heatmap::config::{ColumnMapping, Settings};
use crz_heatmap::entry_points::EntryPointTable;
use crz_heatmap::filter::{FilterSpec, apply_filter};
use crz_heatmap::normalize::{NormalizeOutcome, normalize};
use crz_heatmap::output::{write_csv, write_json, write_rejections};
use crz_heatmap::parser::read_raw_file;
use crz_heatmap::records::DayOfWeek;
use crz_heatmap::render::{frames, markers, render_points};
use crz_heatmap::scale::{Extrema, ScaleConfig};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "crz_heatmap")]
#[command(about = "Aggregate and map congestion-zone vehicle entries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Entries CSV (optionally .gz). Falls back to CRZ_CSV_PATH
    #[arg(short, long)]
    input: Option<String>,

    /// JSON entry-point table. Defaults to the built-in NYC table
    #[arg(short, long)]
    entry_points: Option<String>,

    /// JSON column-name mapping. Defaults to the MTA export headers
    #[arg(long)]
    columns: Option<String>,
}

#[derive(Args, Default)]
struct FilterArgs {
    /// Keep only these vehicle classes (repeatable)
    #[arg(long = "vehicle-class")]
    vehicle_classes: Vec<String>,

    /// Keep only these days of week, e.g. Mon or Saturday (repeatable)
    #[arg(long = "day")]
    days: Vec<DayOfWeek>,

    /// Keep only these time periods, e.g. Peak (repeatable)
    #[arg(long = "time-period")]
    time_periods: Vec<String>,

    /// Keep only these detection regions (repeatable)
    #[arg(long = "region")]
    regions: Vec<String>,

    /// Inclusive hour-of-day range, e.g. 7-10
    #[arg(long)]
    hours: Option<String>,

    /// Earliest instant (YYYY-MM-DD or YYYY-MM-DDTHH:MM[:SS])
    #[arg(long)]
    start: Option<String>,

    /// Latest instant; a bare date includes the whole day
    #[arg(long)]
    end: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize the input and report rejected rows
    Validate {
        #[command(flatten)]
        source: SourceArgs,

        /// CSV file to write rejected rows to
        #[arg(short, long)]
        rejections: Option<String>,
    },
    /// Build time-sliced heatmap frames
    Heatmap {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filters: FilterArgs,

        /// Bucket width, e.g. 10min, 1h, 1d
        #[arg(short, long, default_value = "1h")]
        granularity: Granularity,

        /// Scale against every frame instead of each frame alone
        #[arg(long, default_value_t = false)]
        global_extrema: bool,

        #[arg(long, default_value_t = 5.0)]
        min_radius: f64,

        #[arg(long, default_value_t = 25.0)]
        max_radius: f64,

        /// JSON output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Show the single time bucket containing an instant
    Slide {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filters: FilterArgs,

        /// Bucket width, e.g. 10min, 1h, 1d
        #[arg(short, long, default_value = "1h")]
        granularity: Granularity,

        /// Instant to slide to (YYYY-MM-DDTHH:MM[:SS])
        #[arg(long)]
        at: String,

        /// JSON output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// One marker per region sized by its total over the filtered range
    Markers {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filters: FilterArgs,

        #[arg(long, default_value_t = 5.0)]
        min_radius: f64,

        #[arg(long, default_value_t = 25.0)]
        max_radius: f64,

        /// JSON output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Totals, peaks, and per-dimension breakdowns
    Summary {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filters: FilterArgs,

        /// JSON output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Per day, region, and vehicle class totals with peak hour
    Daily {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filters: FilterArgs,

        /// CSV file to write the rollup to
        #[arg(short, long, default_value = "daily_aggregates.csv")]
        output: String,
    },
}

fn main() -> Result<()> {
    let settings = Settings::from_env();

    // Logging setup: colored stderr + JSON rolling log file
    let log_dir = Path::new(&settings.log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&settings.log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("crz_heatmap.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { source, rejections } => {
            let outcome = load(&source, &settings)?;
            info!(
                normalized = outcome.normalized.len(),
                rejected = outcome.rejected.len(),
                "Validation finished"
            );
            if let Some(path) = rejections {
                write_rejections(&path, &outcome.rejected)?;
            }
        }
        Commands::Heatmap {
            source,
            filters,
            granularity,
            global_extrema,
            min_radius,
            max_radius,
            output,
        } => {
            let scale = ScaleConfig {
                extrema: if global_extrema {
                    Extrema::Global
                } else {
                    Extrema::Local
                },
                ..radius_scale(min_radius, max_radius)?
            };

            let spec = filters.to_spec()?;
            let mut engine = QueryEngine::new(load(&source, &settings)?.normalized);
            let buckets = engine.buckets(&spec, granularity)?;
            let time_frames = frames(&buckets, &scale);

            info!(
                frames = time_frames.len(),
                buckets = buckets.len(),
                granularity = %granularity,
                "Heatmap frames built"
            );
            write_json(output.as_deref(), &time_frames)?;
        }
        Commands::Slide {
            source,
            filters,
            granularity,
            at,
            output,
        } => {
            let at = parse_instant(&at, false)?;
            let spec = filters.to_spec()?;
            let mut engine = QueryEngine::new(load(&source, &settings)?.normalized);

            let slot = engine.slide_to(&spec, granularity, at)?;
            let counts: Vec<u64> = slot.iter().map(|b| b.count).collect();
            let points = render_points(&slot, &counts, &ScaleConfig::default());

            if points.is_empty() {
                warn!(at = %at, granularity = %granularity, "No entries in this time bucket");
            }
            write_json(output.as_deref(), &points)?;
        }
        Commands::Markers {
            source,
            filters,
            min_radius,
            max_radius,
            output,
        } => {
            let scale = radius_scale(min_radius, max_radius)?;
            let spec = filters.to_spec()?;
            let outcome = load(&source, &settings)?;
            let filtered = apply_filter(&outcome.normalized, &spec)?;
            let points = markers(&location_totals(filtered), &scale);

            info!(markers = points.len(), "Location markers built");
            write_json(output.as_deref(), &points)?;
        }
        Commands::Summary {
            source,
            filters,
            output,
        } => {
            let spec = filters.to_spec()?;
            let outcome = load(&source, &settings)?;
            let filtered = apply_filter(&outcome.normalized, &spec)?;
            write_json(output.as_deref(), &summarize(filtered))?;
        }
        Commands::Daily {
            source,
            filters,
            output,
        } => {
            let spec = filters.to_spec()?;
            let outcome = load(&source, &settings)?;
            let filtered = apply_filter(&outcome.normalized, &spec)?;
            write_csv(&output, &daily_rollup(filtered))?;
        }
    }

    Ok(())
}

/// Reads and normalizes the input named by `source` (or the environment).
#[tracing::instrument(skip_all)]
fn load(source: &SourceArgs, settings: &Settings) -> Result<NormalizeOutcome> {
    let input = source
        .input
        .clone()
        .or_else(|| settings.csv_path.clone())
        .context("no input file: pass --input or set CRZ_CSV_PATH")?;

    let mapping = match source.columns.as_ref().or(settings.columns_path.as_ref()) {
        Some(path) => ColumnMapping::load(path)
            .with_context(|| format!("loading column mapping from {}", path))?,
        None => ColumnMapping::default(),
    };

    let table = match source
        .entry_points
        .as_ref()
        .or(settings.entry_points_path.as_ref())
    {
        Some(path) => EntryPointTable::load(path)
            .with_context(|| format!("loading entry points from {}", path))?,
        None => EntryPointTable::nyc(),
    };
    info!(input = %input, entry_points = table.len(), "Loading entries");

    let raw = read_raw_file(&input, &mapping).with_context(|| format!("reading {}", input))?;
    let outcome = normalize(&raw, &table);

    if !outcome.rejected.is_empty() {
        warn!(
            rejected = outcome.rejected.len(),
            "Some rows were rejected; run `validate --rejections <file>` for details"
        );
    }
    Ok(outcome)
}

/// Default scale with the radius bounds given on the command line.
fn radius_scale(min_radius: f64, max_radius: f64) -> Result<ScaleConfig> {
    ScaleConfig::with_radii(min_radius, max_radius).ok_or_else(|| {
        anyhow!(
            "radii must be finite, non-negative, and min <= max (got {} and {})",
            min_radius,
            max_radius
        )
    })
}

/// Parses `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM[:SS]` or `YYYY-MM-DD HH:MM[:SS]`.
/// A bare date is midnight, or the last second of the day when `end_of_day`.
fn parse_instant(value: &str, end_of_day: bool) -> Result<NaiveDateTime> {
    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    if let Some(t) = FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
    {
        return Ok(t);
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("cannot parse '{}' as a date or date-time", value))?;
    let time = if end_of_day {
        NaiveTime::from_hms_opt(23, 59, 59)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    };
    Ok(date.and_time(time.context("invalid time of day")?))
}

impl FilterArgs {
    fn to_spec(&self) -> Result<FilterSpec> {
        let mut spec = FilterSpec::all();

        if !self.vehicle_classes.is_empty() {
            spec = spec.with_vehicle_classes(self.vehicle_classes.iter().cloned());
        }
        if !self.days.is_empty() {
            spec = spec.with_days(self.days.iter().copied());
        }
        if !self.time_periods.is_empty() {
            spec = spec.with_time_periods(self.time_periods.iter().cloned());
        }
        if !self.regions.is_empty() {
            spec = spec.with_regions(self.regions.iter().cloned());
        }
        if let Some(hours) = &self.hours {
            let (start, end) = hours
                .split_once('-')
                .context("--hours must look like START-END, e.g. 7-10")?;
            spec = spec.with_hours(start.trim().parse()?, end.trim().parse()?);
        }
        if self.start.is_some() || self.end.is_some() {
            let start = match &self.start {
                Some(s) => parse_instant(s, false)?,
                None => NaiveDateTime::MIN,
            };
            let end = match &self.end {
                Some(s) => parse_instant(s, true)?,
                None => NaiveDateTime::MAX,
            };
            spec = spec.with_time_range(start, end);
        }

        spec.validate()?;
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_instant_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        assert_eq!(parse_instant("2025-01-02T08:30", false).unwrap(), expected);
        assert_eq!(parse_instant("2025-01-02 08:30:00", false).unwrap(), expected);
        assert!(parse_instant("yesterday", false).is_err());
    }

    #[test]
    fn test_bare_end_date_covers_whole_day() {
        let end = parse_instant("2025-01-02", true).unwrap();
        assert_eq!(end.to_string(), "2025-01-02 23:59:59");
        let start = parse_instant("2025-01-02", false).unwrap();
        assert_eq!(start.to_string(), "2025-01-02 00:00:00");
    }

    #[test]
    fn test_filter_args_to_spec() {
        let args = FilterArgs {
            vehicle_classes: vec!["Bus".into()],
            days: vec![DayOfWeek::Monday],
            hours: Some("7-10".into()),
            end: Some("2025-01-31".into()),
            ..Default::default()
        };
        let spec = args.to_spec().unwrap();
        assert_eq!(spec.vehicle_classes.unwrap().len(), 1);
        assert_eq!(spec.hours.unwrap().start, 7);
        assert_eq!(spec.time_range.unwrap().start, NaiveDateTime::MIN);
        assert!(spec.regions.is_none());
    }

    #[test]
    fn test_filter_args_reject_bad_hours() {
        let args = FilterArgs {
            hours: Some("10-7".into()),
            ..Default::default()
        };
        assert!(args.to_spec().is_err());

        let args = FilterArgs {
            hours: Some("morning".into()),
            ..Default::default()
        };
        assert!(args.to_spec().is_err());
    }

    #[test]
    fn test_radius_scale_rejects_bad_bounds() {
        assert!(radius_scale(5.0, 25.0).is_ok());
        assert!(radius_scale(25.0, 5.0).is_err());
        assert!(radius_scale(f64::NAN, 25.0).is_err());
    }

    #[test]
    fn test_cli_parses_markers() {
        let cli = Cli::try_parse_from([
            "crz_heatmap",
            "markers",
            "--input",
            "entries.csv",
            "--min-radius",
            "NaN",
        ])
        .unwrap();
        match cli.command {
            Commands::Markers { min_radius, .. } => {
                assert!(radius_scale(min_radius, 25.0).is_err());
            }
            _ => panic!("expected markers command"),
        }
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "crz_heatmap",
            "heatmap",
            "--input",
            "entries.csv",
            "--granularity",
            "10min",
            "--day",
            "sat",
            "--vehicle-class",
            "Bus",
        ])
        .unwrap();
        match cli.command {
            Commands::Heatmap {
                granularity,
                filters,
                ..
            } => {
                assert_eq!(granularity, Granularity::TEN_MINUTES);
                assert_eq!(filters.days, vec![DayOfWeek::Saturday]);
            }
            _ => panic!("expected heatmap command"),
        }
    }
}
