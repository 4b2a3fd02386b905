use crate::analyzers::granularity::Granularity;
use crate::analyzers::utility::{saturating_total, tally};
use crate::entry_points::GeoPoint;
use crate::error::QueryError;
use crate::records::NormalizedRecord;
use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

/// Summed entry count for one location in one time bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AggregateBucket {
    #[serde(flatten)]
    pub location: GeoPoint,
    pub bucket_start: NaiveDateTime,
    pub count: u64,
}

/// Summed entry count for one detection region over the whole query, with
/// no time bucketing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationTotal {
    pub region: String,
    #[serde(flatten)]
    pub location: GeoPoint,
    pub count: u64,
}

/// Collapses the entry counts of one group into a single value.
pub trait Reducer {
    fn reduce(&self, counts: &[u64]) -> u64;
}

/// Total of the group. The default reduction.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sum;

impl Reducer for Sum {
    fn reduce(&self, counts: &[u64]) -> u64 {
        saturating_total(counts.iter().copied())
    }
}

/// Largest single count in the group.
#[derive(Debug, Clone, Copy, Default)]
pub struct Max;

impl Reducer for Max {
    fn reduce(&self, counts: &[u64]) -> u64 {
        counts.iter().copied().max().unwrap_or(0)
    }
}

impl<F> Reducer for F
where
    F: Fn(&[u64]) -> u64,
{
    fn reduce(&self, counts: &[u64]) -> u64 {
        self(counts)
    }
}

/// Hashable identity of a (location, bucket) group. `-0.0` and `0.0` share a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct GroupKey {
    lat_bits: u64,
    lon_bits: u64,
    bucket_secs: i64,
}

impl GroupKey {
    fn new(location: GeoPoint, bucket_start: NaiveDateTime) -> Self {
        Self {
            lat_bits: (location.latitude + 0.0).to_bits(),
            lon_bits: (location.longitude + 0.0).to_bits(),
            bucket_secs: bucket_start.and_utc().timestamp(),
        }
    }
}

/// Sums entry counts per (latitude, longitude, bucket start).
///
/// Output order is unspecified; use [`sort_buckets`] when it matters.
///
/// # Errors
///
/// [`QueryError::InvalidGranularity`] when `granularity` is not a positive
/// whole number of seconds, or a record's bucket cannot be represented. No
/// partial output is produced.
pub fn aggregate<'a, I>(
    records: I,
    granularity: TimeDelta,
) -> Result<Vec<AggregateBucket>, QueryError>
where
    I: IntoIterator<Item = &'a NormalizedRecord>,
{
    let granularity = Granularity::new(granularity)?;
    aggregate_with(records, granularity, &Sum)
}

/// Groups like [`aggregate`] but reduces each group with `reducer`.
///
/// # Errors
///
/// [`QueryError::InvalidGranularity`] when a record's bucket would start
/// before the earliest representable instant.
pub fn aggregate_with<'a, I, R>(
    records: I,
    granularity: Granularity,
    reducer: &R,
) -> Result<Vec<AggregateBucket>, QueryError>
where
    I: IntoIterator<Item = &'a NormalizedRecord>,
    R: Reducer + ?Sized,
{
    let mut groups: HashMap<GroupKey, (GeoPoint, NaiveDateTime, Vec<u64>)> = HashMap::new();
    let mut record_count = 0usize;

    for record in records {
        record_count += 1;
        let bucket_start = granularity.floor(record.timestamp)?;
        groups
            .entry(GroupKey::new(record.location, bucket_start))
            .or_insert_with(|| (record.location, bucket_start, Vec::new()))
            .2
            .push(record.entry_count);
    }

    let buckets: Vec<_> = groups
        .into_values()
        .map(|(location, bucket_start, counts)| AggregateBucket {
            location,
            bucket_start,
            count: reducer.reduce(&counts),
        })
        .collect();

    debug!(
        records = record_count,
        buckets = buckets.len(),
        granularity_secs = granularity.as_secs(),
        "Aggregation complete"
    );

    Ok(buckets)
}

/// Totals entry counts per (region, latitude, longitude), ignoring time.
///
/// Regions that share coordinates stay separate. Output is sorted by region,
/// then latitude and longitude.
pub fn location_totals<'a, I>(records: I) -> Vec<LocationTotal>
where
    I: IntoIterator<Item = &'a NormalizedRecord>,
{
    let mut groups: HashMap<(&str, u64, u64), LocationTotal> = HashMap::new();

    for record in records {
        let loc = record.location;
        let key = (
            record.region.as_str(),
            (loc.latitude + 0.0).to_bits(),
            (loc.longitude + 0.0).to_bits(),
        );
        let total = groups.entry(key).or_insert_with(|| LocationTotal {
            region: record.region.clone(),
            location: loc,
            count: 0,
        });
        tally(&mut total.count, record.entry_count);
    }

    let mut totals: Vec<_> = groups.into_values().collect();
    totals.sort_by(|a, b| {
        a.region
            .cmp(&b.region)
            .then_with(|| a.location.latitude.total_cmp(&b.location.latitude))
            .then_with(|| a.location.longitude.total_cmp(&b.location.longitude))
    });

    debug!(locations = totals.len(), "Location totals complete");
    totals
}

/// Orders buckets by (bucket start, latitude, longitude).
pub fn sort_buckets(buckets: &mut [AggregateBucket]) {
    buckets.sort_by(compare_buckets);
}

fn compare_buckets(a: &AggregateBucket, b: &AggregateBucket) -> Ordering {
    a.bucket_start
        .cmp(&b.bucket_start)
        .then_with(|| a.location.latitude.total_cmp(&b.location.latitude))
        .then_with(|| a.location.longitude.total_cmp(&b.location.longitude))
}

/// Sum of all bucket counts.
pub fn total_count(buckets: &[AggregateBucket]) -> u64 {
    saturating_total(buckets.iter().map(|b| b.count))
}
