//! Count → marker radius and color.
//!
//! All functions are pure. Counts are compared against the largest count in
//! the current view; an all-zero (or empty) view maps everything to the
//! low end of each scale.

use serde::{Serialize, Serializer};
use std::fmt;

/// 8-bit RGB color, serialized as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLUE: Rgb = Rgb::new(0, 0, 255);
    pub const LIME: Rgb = Rgb::new(0, 255, 0);
    pub const ORANGE: Rgb = Rgb::new(255, 165, 0);
    pub const RED: Rgb = Rgb::new(255, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let channel = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb::new(
            channel(self.r, other.r),
            channel(self.g, other.g),
            channel(self.b, other.b),
        )
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Piecewise-linear color ramp over [0, 1].
///
/// Stops are sorted by position on construction. Below the first stop the
/// first color is used; above the last, the last color.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    stops: Vec<(f64, Rgb)>,
}

impl Gradient {
    /// Returns `None` if `stops` is empty or any position is outside [0, 1].
    pub fn new(mut stops: Vec<(f64, Rgb)>) -> Option<Self> {
        if stops.is_empty() || stops.iter().any(|(p, _)| !(0.0..=1.0).contains(p)) {
            return None;
        }
        stops.sort_by(|a, b| a.0.total_cmp(&b.0));
        Some(Self { stops })
    }

    pub fn at(&self, ratio: f64) -> Rgb {
        let t = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };

        let (first_pos, first_color) = self.stops[0];
        if t <= first_pos {
            return first_color;
        }

        for pair in self.stops.windows(2) {
            let (lo_pos, lo_color) = pair[0];
            let (hi_pos, hi_color) = pair[1];
            if t <= hi_pos {
                let span = hi_pos - lo_pos;
                if span <= 0.0 {
                    return hi_color;
                }
                return lo_color.lerp(hi_color, (t - lo_pos) / span);
            }
        }

        self.stops[self.stops.len() - 1].1
    }
}

impl Default for Gradient {
    /// Blue → lime → orange → red.
    fn default() -> Self {
        Self {
            stops: vec![
                (0.2, Rgb::BLUE),
                (0.4, Rgb::LIME),
                (0.6, Rgb::ORANGE),
                (1.0, Rgb::RED),
            ],
        }
    }
}

/// Which counts a point is scaled against when rendering time frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Extrema {
    /// Only the counts in the same time frame.
    #[default]
    Local,
    /// Every count across all frames.
    Global,
}

/// Scaling parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleConfig {
    pub min_radius: f64,
    pub max_radius: f64,
    pub gradient: Gradient,
    pub extrema: Extrema,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            min_radius: 5.0,
            max_radius: 25.0,
            gradient: Gradient::default(),
            extrema: Extrema::Local,
        }
    }
}

fn max_in_view(counts_in_view: &[u64]) -> u64 {
    counts_in_view.iter().copied().max().unwrap_or(0)
}

impl ScaleConfig {
    /// Default config with the given radius bounds. Returns `None` unless both
    /// are finite, non-negative, and `min_radius <= max_radius`.
    pub fn with_radii(min_radius: f64, max_radius: f64) -> Option<Self> {
        let valid = min_radius.is_finite()
            && max_radius.is_finite()
            && min_radius >= 0.0
            && min_radius <= max_radius;
        valid.then(|| Self {
            min_radius,
            max_radius,
            ..Self::default()
        })
    }

    /// Log-scaled radius, clamped to `[min_radius, max_radius]`.
    ///
    /// `min + (max - min) * ln(1 + count) / ln(1 + max_in_view)`
    pub fn radius(&self, count: u64, counts_in_view: &[u64]) -> f64 {
        let max_count = max_in_view(counts_in_view);
        if max_count == 0 {
            return self.min_radius;
        }
        let ratio = (count as f64).ln_1p() / (max_count as f64).ln_1p();
        let radius = self.min_radius + (self.max_radius - self.min_radius) * ratio;
        // Unlike `clamp`, never panics on inverted or NaN bounds.
        radius.max(self.min_radius).min(self.max_radius)
    }

    /// Gradient color at `count / max_in_view`.
    pub fn color(&self, count: u64, counts_in_view: &[u64]) -> Rgb {
        let max_count = max_in_view(counts_in_view);
        let ratio = if max_count == 0 {
            0.0
        } else {
            count as f64 / max_count as f64
        };
        self.gradient.at(ratio)
    }
}

/// [`ScaleConfig::radius`] with the default configuration.
pub fn scale_radius(count: u64, counts_in_view: &[u64]) -> f64 {
    ScaleConfig::default().radius(count, counts_in_view)
}

/// [`ScaleConfig::color`] with the default configuration.
pub fn scale_color(count: u64, counts_in_view: &[u64]) -> Rgb {
    ScaleConfig::default().color(count, counts_in_view)
}
