//! Declarative record filters, applied before aggregation.

use crate::error::QueryError;
use crate::records::{DayOfWeek, NormalizedRecord};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Inclusive `[start, end]` timestamp range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeRange {
    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.start <= t && t <= self.end
    }
}

/// Inclusive hour-of-day range, both ends in 0..=23.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HourRange {
    pub start: u32,
    pub end: u32,
}

/// Query-time filter. A `None` dimension does not restrict anything; all
/// present dimensions must match.
///
/// Categorical fields are compared verbatim against the record's labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterSpec {
    pub vehicle_classes: Option<BTreeSet<String>>,
    pub days_of_week: Option<BTreeSet<DayOfWeek>>,
    pub time_periods: Option<BTreeSet<String>>,
    pub regions: Option<BTreeSet<String>>,
    pub hours: Option<HourRange>,
    pub time_range: Option<TimeRange>,
}

impl FilterSpec {
    /// A spec with no restrictions.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_vehicle_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vehicle_classes = Some(classes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_days<I: IntoIterator<Item = DayOfWeek>>(mut self, days: I) -> Self {
        self.days_of_week = Some(days.into_iter().collect());
        self
    }

    pub fn with_time_periods<I, S>(mut self, periods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.time_periods = Some(periods.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.regions = Some(regions.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_hours(mut self, start: u32, end: u32) -> Self {
        self.hours = Some(HourRange { start, end });
        self
    }

    pub fn with_time_range(mut self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        self.time_range = Some(TimeRange { start, end });
        self
    }

    /// Checks the spec is well formed.
    ///
    /// # Errors
    ///
    /// [`QueryError::InvalidFilterSpec`] for an inverted timestamp range, an
    /// inverted or out-of-bounds hour range, or a present but empty set.
    pub fn validate(&self) -> Result<(), QueryError> {
        let invalid = |msg: String| Err(QueryError::InvalidFilterSpec(msg));

        if let Some(range) = &self.time_range {
            if range.start > range.end {
                return invalid(format!(
                    "time range start {} is after end {}",
                    range.start, range.end
                ));
            }
        }

        if let Some(hours) = &self.hours {
            if hours.start > 23 || hours.end > 23 || hours.start > hours.end {
                return invalid(format!(
                    "hour range {}-{} must satisfy 0 <= start <= end <= 23",
                    hours.start, hours.end
                ));
            }
        }

        let empty_sets = [
            ("vehicle_classes", self.vehicle_classes.as_ref().map(BTreeSet::is_empty)),
            ("days_of_week", self.days_of_week.as_ref().map(BTreeSet::is_empty)),
            ("time_periods", self.time_periods.as_ref().map(BTreeSet::is_empty)),
            ("regions", self.regions.as_ref().map(BTreeSet::is_empty)),
        ];
        if let Some((name, _)) = empty_sets.iter().find(|(_, empty)| *empty == Some(true)) {
            return invalid(format!(
                "{} is present but empty; leave it unset to match everything",
                name
            ));
        }

        Ok(())
    }

    /// Whether `record` passes every present dimension.
    pub fn matches(&self, record: &NormalizedRecord) -> bool {
        if let Some(classes) = &self.vehicle_classes {
            if !classes.contains(&record.vehicle_class) {
                return false;
            }
        }

        if let Some(days) = &self.days_of_week {
            if !days.contains(&record.day_of_week()) {
                return false;
            }
        }

        if let Some(periods) = &self.time_periods {
            match &record.time_period {
                Some(period) if periods.contains(period) => {}
                _ => return false,
            }
        }

        if let Some(regions) = &self.regions {
            if !regions.contains(&record.region) {
                return false;
            }
        }

        if let Some(hours) = &self.hours {
            let hour = record.hour_of_day();
            if hour < hours.start || hour > hours.end {
                return false;
            }
        }

        if let Some(range) = &self.time_range {
            if !range.contains(record.timestamp) {
                return false;
            }
        }

        true
    }
}

/// Returns the records that pass `spec`, in input order. The input is not
/// modified; an empty result is valid.
pub fn apply_filter<'a>(
    records: &'a [NormalizedRecord],
    spec: &FilterSpec,
) -> Result<Vec<&'a NormalizedRecord>, QueryError> {
    spec.validate()?;
    Ok(records.iter().filter(|r| spec.matches(r)).collect())
}
