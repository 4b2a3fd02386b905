//! Time-bucket width and flooring.

use crate::error::QueryError;
use chrono::{DateTime, NaiveDateTime, TimeDelta};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// A validated bucket width: a whole number of seconds, at least one.
///
/// Buckets start at multiples of the width counted from
/// 1970-01-01T00:00:00 (wall clock), so boundaries are identical across
/// queries with the same width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Granularity {
    secs: i64,
}

impl Granularity {
    pub const TEN_MINUTES: Granularity = Granularity { secs: 600 };
    pub const HOUR: Granularity = Granularity { secs: 3_600 };
    pub const DAY: Granularity = Granularity { secs: 86_400 };

    /// # Errors
    ///
    /// [`QueryError::InvalidGranularity`] when `width` is zero, negative, or
    /// not a whole number of seconds.
    pub fn new(width: TimeDelta) -> Result<Self, QueryError> {
        if width <= TimeDelta::zero() {
            return Err(QueryError::InvalidGranularity(format!(
                "granularity must be positive, got {}s",
                width.num_seconds()
            )));
        }
        if width.subsec_nanos() != 0 {
            return Err(QueryError::InvalidGranularity(format!(
                "granularity must be whole seconds, got {}",
                width
            )));
        }
        Ok(Self {
            secs: width.num_seconds(),
        })
    }

    pub fn from_secs(secs: i64) -> Result<Self, QueryError> {
        let width = TimeDelta::try_seconds(secs).ok_or_else(|| {
            QueryError::InvalidGranularity(format!("{}s is out of range", secs))
        })?;
        Self::new(width)
    }

    pub fn as_secs(&self) -> i64 {
        self.secs
    }

    pub fn as_delta(&self) -> TimeDelta {
        TimeDelta::seconds(self.secs)
    }

    /// Floors `t` to the start of its bucket.
    ///
    /// # Errors
    ///
    /// [`QueryError::InvalidGranularity`] when the bucket would start before
    /// the earliest representable instant (very wide widths, or `t` near
    /// `NaiveDateTime::MIN`).
    pub fn floor(&self, t: NaiveDateTime) -> Result<NaiveDateTime, QueryError> {
        let epoch_secs = t.and_utc().timestamp();
        epoch_secs
            .div_euclid(self.secs)
            .checked_mul(self.secs)
            .and_then(|start| DateTime::from_timestamp(start, 0))
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| {
                QueryError::InvalidGranularity(format!(
                    "{} bucket containing {} starts before the earliest representable instant",
                    self, t
                ))
            })
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.secs {
            s if s % 86_400 == 0 => write!(f, "{}d", s / 86_400),
            s if s % 3_600 == 0 => write!(f, "{}h", s / 3_600),
            s if s % 60 == 0 => write!(f, "{}min", s / 60),
            s => write!(f, "{}s", s),
        }
    }
}

impl FromStr for Granularity {
    type Err = QueryError;

    /// Parses `90s`, `10min`, `15m`, `1h`, `hour`, `1d`, `day`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let invalid = || QueryError::InvalidGranularity(format!("cannot parse '{}'", s));

        match s.as_str() {
            "hour" | "hourly" => return Ok(Self::HOUR),
            "day" | "daily" => return Ok(Self::DAY),
            _ => {}
        }

        let split = s.find(|c: char| !c.is_ascii_digit() && c != '-').ok_or_else(invalid)?;
        let (amount, unit) = s.split_at(split);
        let amount: i64 = amount.parse().map_err(|_| invalid())?;
        let unit_secs = match unit {
            "s" | "sec" | "secs" => 1,
            "m" | "min" | "mins" => 60,
            "h" | "hr" | "hrs" => 3_600,
            "d" | "day" | "days" => 86_400,
            _ => return Err(invalid()),
        };

        let secs = amount.checked_mul(unit_secs).ok_or_else(invalid)?;
        Self::from_secs(secs)
    }
}
