//! Query front door: filter, aggregate, and memoize per (filter, granularity).

use crate::analyzers::aggregate::{AggregateBucket, Sum, aggregate_with, sort_buckets};
use crate::analyzers::granularity::Granularity;
use crate::error::QueryError;
use crate::filter::{FilterSpec, apply_filter};
use crate::records::NormalizedRecord;
use chrono::NaiveDateTime;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info};

type CacheKey = (FilterSpec, Granularity);

/// Memoized aggregate results, keyed by the query that produced them.
///
/// Holds at most `capacity` entries; inserting past that evicts the oldest.
/// Only valid for one record set; [`QueryEngine::reload`] clears it.
#[derive(Debug)]
pub struct AggregateCache {
    entries: HashMap<CacheKey, Arc<[AggregateBucket]>>,
    order: VecDeque<CacheKey>,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl Default for AggregateCache {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}

impl AggregateCache {
    pub const DEFAULT_CAPACITY: usize = 64;

    /// A cache holding at most `capacity` results (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
            hits: 0,
            misses: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&mut self, spec: &FilterSpec, granularity: Granularity) -> Option<Arc<[AggregateBucket]>> {
        let found = self.entries.get(&(spec.clone(), granularity)).cloned();
        if found.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        found
    }

    pub fn insert(&mut self, spec: FilterSpec, granularity: Granularity, buckets: Arc<[AggregateBucket]>) {
        let key = (spec, granularity);
        if self.entries.insert(key.clone(), buckets).is_some() {
            return;
        }
        self.order.push_back(key);

        while self.entries.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
            debug!(capacity = self.capacity, "Evicted oldest cached aggregate");
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

/// Holds the shared, read-only record set and answers slider/filter queries.
///
/// Results are sorted by (bucket start, latitude, longitude).
#[derive(Debug)]
pub struct QueryEngine {
    records: Arc<[NormalizedRecord]>,
    cache: Option<AggregateCache>,
}

impl QueryEngine {
    /// An engine that memoizes results.
    pub fn new(records: Vec<NormalizedRecord>) -> Self {
        Self {
            records: records.into(),
            cache: Some(AggregateCache::default()),
        }
    }

    /// An engine that memoizes at most `capacity` results.
    pub fn with_cache_capacity(records: Vec<NormalizedRecord>, capacity: usize) -> Self {
        Self {
            records: records.into(),
            cache: Some(AggregateCache::with_capacity(capacity)),
        }
    }

    /// An engine that recomputes every query.
    pub fn uncached(records: Vec<NormalizedRecord>) -> Self {
        Self {
            records: records.into(),
            cache: None,
        }
    }

    pub fn records(&self) -> &Arc<[NormalizedRecord]> {
        &self.records
    }

    pub fn cache(&self) -> Option<&AggregateCache> {
        self.cache.as_ref()
    }

    /// Replaces the record set and drops every memoized result.
    pub fn reload(&mut self, records: Vec<NormalizedRecord>) {
        info!(records = records.len(), "Reloading record set");
        self.records = records.into();
        if let Some(cache) = &mut self.cache {
            cache.clear();
        }
    }

    /// Filters then aggregates, consulting the cache first.
    pub fn buckets(
        &mut self,
        spec: &FilterSpec,
        granularity: Granularity,
    ) -> Result<Arc<[AggregateBucket]>, QueryError> {
        if let Some(hit) = self.cache.as_mut().and_then(|c| c.get(spec, granularity)) {
            debug!(granularity = %granularity, "Aggregate cache hit");
            return Ok(hit);
        }

        let filtered = apply_filter(&self.records, spec)?;
        let mut buckets = aggregate_with(filtered, granularity, &Sum)?;
        sort_buckets(&mut buckets);
        let buckets: Arc<[AggregateBucket]> = buckets.into();

        if let Some(cache) = &mut self.cache {
            cache.insert(spec.clone(), granularity, Arc::clone(&buckets));
        }
        Ok(buckets)
    }

    /// The buckets of the single time slot containing `at`.
    pub fn slide_to(
        &mut self,
        spec: &FilterSpec,
        granularity: Granularity,
        at: NaiveDateTime,
    ) -> Result<Vec<AggregateBucket>, QueryError> {
        let bucket_start = granularity.floor(at)?;
        let all = self.buckets(spec, granularity)?;
        Ok(all
            .iter()
            .filter(|b| b.bucket_start == bucket_start)
            .copied()
            .collect())
    }

    /// Distinct bucket starts in ascending order; the slider's stops.
    pub fn timeline(
        &mut self,
        spec: &FilterSpec,
        granularity: Granularity,
    ) -> Result<Vec<NaiveDateTime>, QueryError> {
        let all = self.buckets(spec, granularity)?;
        let mut starts: Vec<_> = all.iter().map(|b| b.bucket_start).collect();
        starts.dedup();
        Ok(starts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry_points::GeoPoint;
    use chrono::NaiveDate;

    #[test]
    fn test_cache_hit_returns_same_result() {
        let mut engine = QueryEngine::new(sample());
        let spec = FilterSpec::all();

        let first = engine.buckets(&spec, Granularity::HOUR).unwrap();
        let second = engine.buckets(&spec, Granularity::HOUR).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        let cache = engine.cache().unwrap();
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_keyed_by_spec_and_granularity() {
        let mut engine = QueryEngine::new(sample());
        let all = FilterSpec::all();
        let cars = FilterSpec::all().with_vehicle_classes(["Cars"]);

        engine.buckets(&all, Granularity::HOUR).unwrap();
        engine.buckets(&all, Granularity::DAY).unwrap();
        engine.buckets(&cars, Granularity::HOUR).unwrap();

        assert_eq!(engine.cache().unwrap().len(), 3);
    }

    #[test]
    fn test_cache_evicts_oldest_past_capacity() {
        let mut engine = QueryEngine::with_cache_capacity(sample(), 2);
        let all = FilterSpec::all();
        let cars = FilterSpec::all().with_vehicle_classes(["Cars"]);

        engine.buckets(&all, Granularity::HOUR).unwrap();
        engine.buckets(&all, Granularity::DAY).unwrap();
        engine.buckets(&cars, Granularity::HOUR).unwrap();
        assert_eq!(engine.cache().unwrap().len(), 2);

        // The first query was evicted; the newer two are still hits.
        engine.buckets(&cars, Granularity::HOUR).unwrap();
        engine.buckets(&all, Granularity::DAY).unwrap();
        assert_eq!(engine.cache().unwrap().hits(), 2);
        engine.buckets(&all, Granularity::HOUR).unwrap();
        assert_eq!(engine.cache().unwrap().misses(), 4);
        assert_eq!(engine.cache().unwrap().len(), 2);
    }

    #[test]
    fn test_cache_capacity_is_at_least_one() {
        let mut cache = AggregateCache::with_capacity(0);
        assert_eq!(cache.capacity(), 1);
        cache.insert(FilterSpec::all(), Granularity::HOUR, Arc::from(Vec::new()));
        cache.insert(FilterSpec::all(), Granularity::DAY, Arc::from(Vec::new()));
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&FilterSpec::all(), Granularity::DAY).is_some());
    }

    #[test]
    fn test_reload_invalidates_cache() {
        let mut engine = QueryEngine::new(sample());
        let spec = FilterSpec::all();
        let before = engine.buckets(&spec, Granularity::DAY).unwrap();
        assert_eq!(before[0].count, 15);

        engine.reload(vec![record(at(2, 8, 0), "Cars", 1)]);
        assert!(engine.cache().unwrap().is_empty());

        let after = engine.buckets(&spec, Granularity::DAY).unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].count, 1);
    }

    #[test]
    fn test_cached_and_uncached_agree() {
        let spec = FilterSpec::all().with_vehicle_classes(["Cars"]);
        let mut cached = QueryEngine::new(sample());
        let mut uncached = QueryEngine::uncached(sample());

        let a = cached.buckets(&spec, Granularity::HOUR).unwrap();
        let b = uncached.buckets(&spec, Granularity::HOUR).unwrap();
        assert_eq!(a, b);
        assert!(uncached.cache().is_none());
    }

    #[test]
    fn test_invalid_spec_is_not_cached() {
        let mut engine = QueryEngine::new(sample());
        let bad = FilterSpec::all().with_hours(5, 1);
        assert!(engine.buckets(&bad, Granularity::HOUR).is_err());
        assert!(engine.cache().unwrap().is_empty());
    }

    #[test]
    fn test_slide_to_returns_single_slot() {
        let mut engine = QueryEngine::new(sample());
        let slot = engine
            .slide_to(&FilterSpec::all(), Granularity::HOUR, at(2, 8, 59))
            .unwrap();
        assert_eq!(slot.len(), 1);
        assert_eq!(slot[0].bucket_start, at(2, 8, 0));
        assert_eq!(slot[0].count, 10);

        let empty = engine
            .slide_to(&FilterSpec::all(), Granularity::HOUR, at(2, 3, 0))
            .unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_timeline_is_sorted_and_distinct() {
        let mut engine = QueryEngine::new(sample());
        let stops = engine.timeline(&FilterSpec::all(), Granularity::HOUR).unwrap();
        assert_eq!(stops, vec![at(2, 8, 0), at(2, 9, 0), at(3, 17, 0)]);
    }

    // Helper functions for tests
    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn record(ts: NaiveDateTime, class: &str, count: u64) -> NormalizedRecord {
        NormalizedRecord {
            timestamp: ts,
            vehicle_class: class.into(),
            time_period: None,
            region: "Holland Tunnel".into(),
            location: GeoPoint::new(40.7256, -74.0119),
            entry_count: count,
            excluded_count: 0,
        }
    }

    fn sample() -> Vec<NormalizedRecord> {
        vec![
            record(at(2, 8, 0), "Cars", 6),
            record(at(2, 8, 30), "Bus", 4),
            record(at(2, 9, 15), "Cars", 5),
            record(at(3, 17, 0), "Cars", 2),
        ]
    }
}
