//! Render payload for map frontends: one point per bucket, grouped into
//! time frames for a slider.

use crate::analyzers::aggregate::{AggregateBucket, LocationTotal, sort_buckets};
use crate::scale::{Extrema, Rgb, ScaleConfig};
use chrono::NaiveDateTime;
use serde::Serialize;

/// Everything a frontend needs to draw one bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub bucket_start: NaiveDateTime,
    pub count: u64,
    pub radius: f64,
    pub color: Rgb,
}

/// One marker per region for the totals view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerPoint {
    pub region: String,
    pub latitude: f64,
    pub longitude: f64,
    pub count: u64,
    pub radius: f64,
    pub color: Rgb,
}

/// Points grouped by bucket start. `intervals[i]` labels `frames[i]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeFrames {
    pub intervals: Vec<NaiveDateTime>,
    pub frames: Vec<Vec<RenderPoint>>,
}

impl TimeFrames {
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// The frame whose interval is `bucket_start`, if any.
    pub fn frame_at(&self, bucket_start: NaiveDateTime) -> Option<&[RenderPoint]> {
        self.intervals
            .binary_search(&bucket_start)
            .ok()
            .map(|i| self.frames[i].as_slice())
    }
}

/// Scales each bucket against `counts_in_view`.
pub fn render_points(
    buckets: &[AggregateBucket],
    counts_in_view: &[u64],
    scale: &ScaleConfig,
) -> Vec<RenderPoint> {
    buckets
        .iter()
        .map(|b| RenderPoint {
            latitude: b.location.latitude,
            longitude: b.location.longitude,
            bucket_start: b.bucket_start,
            count: b.count,
            radius: scale.radius(b.count, counts_in_view),
            color: scale.color(b.count, counts_in_view),
        })
        .collect()
}

/// Scales each location total against all totals passed in.
pub fn markers(totals: &[LocationTotal], scale: &ScaleConfig) -> Vec<MarkerPoint> {
    let counts: Vec<u64> = totals.iter().map(|t| t.count).collect();
    totals
        .iter()
        .map(|t| MarkerPoint {
            region: t.region.clone(),
            latitude: t.location.latitude,
            longitude: t.location.longitude,
            count: t.count,
            radius: scale.radius(t.count, &counts),
            color: scale.color(t.count, &counts),
        })
        .collect()
}

/// Sorts buckets into time frames and scales every point.
///
/// With [`Extrema::Local`] each frame is scaled against its own counts; with
/// [`Extrema::Global`] against every count passed in.
pub fn frames(buckets: &[AggregateBucket], scale: &ScaleConfig) -> TimeFrames {
    let mut sorted = buckets.to_vec();
    sort_buckets(&mut sorted);

    let global_counts: Vec<u64> = sorted.iter().map(|b| b.count).collect();
    let mut out = TimeFrames::default();

    for group in sorted.chunk_by(|a, b| a.bucket_start == b.bucket_start) {
        let local_counts: Vec<u64>;
        let view = match scale.extrema {
            Extrema::Global => global_counts.as_slice(),
            Extrema::Local => {
                local_counts = group.iter().map(|b| b.count).collect();
                local_counts.as_slice()
            }
        };
        out.intervals.push(group[0].bucket_start);
        out.frames.push(render_points(group, view, scale));
    }

    out
}
