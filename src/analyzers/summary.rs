use crate::analyzers::utility::{peak, spread, tally};
use crate::records::{DayOfWeek, NormalizedRecord};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Headline numbers and per-dimension totals for a (filtered) record set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub record_count: usize,
    pub total_entries: u64,
    pub total_excluded: u64,
    pub days_covered: usize,
    pub avg_entries_per_day: f64,
    pub daily_stddev: f64,

    pub peak_hour: Option<u32>,
    pub peak_day: Option<DayOfWeek>,
    pub busiest_region: Option<String>,
    pub top_vehicle_class: Option<String>,

    pub by_hour: BTreeMap<u32, u64>,
    pub by_day_of_week: BTreeMap<DayOfWeek, u64>,
    pub by_region: BTreeMap<String, u64>,
    pub by_vehicle_class: BTreeMap<String, u64>,
    /// Records without a time period are left out of this breakdown only.
    pub by_time_period: BTreeMap<String, u64>,
}

/// Summarizes `records`. Empty input gives an empty summary with no peaks.
pub fn summarize<'a, I>(records: I) -> Summary
where
    I: IntoIterator<Item = &'a NormalizedRecord>,
{
    let mut s = Summary::default();
    let mut by_date: BTreeMap<NaiveDate, u64> = BTreeMap::new();

    for r in records {
        s.record_count += 1;
        let n = r.entry_count;
        s.total_entries = s.total_entries.saturating_add(n);
        s.total_excluded = s.total_excluded.saturating_add(r.excluded_count);

        tally(by_date.entry(r.date()).or_default(), n);
        tally(s.by_hour.entry(r.hour_of_day()).or_default(), n);
        tally(s.by_day_of_week.entry(r.day_of_week()).or_default(), n);
        tally(s.by_region.entry(r.region.clone()).or_default(), n);
        tally(s.by_vehicle_class.entry(r.vehicle_class.clone()).or_default(), n);

        if let Some(period) = &r.time_period {
            tally(s.by_time_period.entry(period.clone()).or_default(), n);
        }
    }

    s.days_covered = by_date.len();
    (s.avg_entries_per_day, s.daily_stddev) = spread(by_date.values().copied());

    s.peak_hour = peak(&s.by_hour);
    s.peak_day = peak(&s.by_day_of_week);
    s.busiest_region = peak(&s.by_region);
    s.top_vehicle_class = peak(&s.by_vehicle_class);

    s
}
