use crate::analyzers::utility::{peak, saturating_total, tally};
use crate::records::NormalizedRecord;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// One row of the daily rollup: a day's entries through one region for one
/// vehicle class, with that day's busiest hour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    pub region: String,
    pub vehicle_class: String,
    pub total_entries: u64,
    pub peak_hour: u32,
    pub peak_hour_count: u64,
}

/// Rolls records up per (date, region, vehicle class), ordered by that key.
///
/// The peak hour is the hour of day with the largest summed count; ties go
/// to the earlier hour.
pub fn daily_rollup<'a, I>(records: I) -> Vec<DailyAggregate>
where
    I: IntoIterator<Item = &'a NormalizedRecord>,
{
    let mut hourly: BTreeMap<(NaiveDate, &str, &str), BTreeMap<u32, u64>> = BTreeMap::new();

    for r in records {
        let hours = hourly
            .entry((r.date(), r.region.as_str(), r.vehicle_class.as_str()))
            .or_default();
        tally(hours.entry(r.hour_of_day()).or_default(), r.entry_count);
    }

    hourly
        .into_iter()
        .map(|((date, region, vehicle_class), hours)| {
            let peak_hour = peak(&hours).unwrap_or(0);
            DailyAggregate {
                date,
                region: region.to_string(),
                vehicle_class: vehicle_class.to_string(),
                total_entries: saturating_total(hours.values().copied()),
                peak_hour,
                peak_hour_count: hours.get(&peak_hour).copied().unwrap_or(0),
            }
        })
        .collect()
}
