//! Record aggregation and the query engine.
//!
//! Filtered records are grouped by (location, time bucket) and reduced to a
//! count per group. [`engine::QueryEngine`] memoizes those results per
//! (filter, granularity); [`summary`] and [`daily`] produce the dashboard
//! rollups.

pub mod aggregate;
pub mod daily;
pub mod engine;
pub mod granularity;
pub mod summary;
pub mod utility;
