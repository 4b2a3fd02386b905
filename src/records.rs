//! Raw and normalized entry records.

use crate::entry_points::GeoPoint;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One row of source data, exactly as read. Every cell is optional text;
/// interpretation happens in [`crate::normalize`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntryRecord {
    /// 1-based data line in the source, 0 when not read from a file.
    pub line: u64,
    pub date: Option<String>,
    pub hour: Option<String>,
    /// Optional sub-hour block, minutes past the hour.
    pub minute: Option<String>,
    pub vehicle_class: Option<String>,
    pub time_period: Option<String>,
    pub region: Option<String>,
    pub count: Option<String>,
    pub excluded: Option<String>,
}

/// Day of week with a fixed Monday = 0 … Sunday = 6 numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
            DayOfWeek::Sunday => "Sunday",
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        DayOfWeek::ALL[day.num_days_from_monday() as usize]
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DayOfWeek {
    type Err = String;

    /// Accepts full or three-letter English names, any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        DayOfWeek::ALL
            .into_iter()
            .find(|day| {
                let label = day.label().to_ascii_lowercase();
                label == needle || label[..3] == needle
            })
            .ok_or_else(|| format!("unknown day of week: '{}'", s))
    }
}

/// A validated, located record. Only these flow past the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    pub timestamp: NaiveDateTime,
    pub vehicle_class: String,
    pub time_period: Option<String>,
    pub region: String,
    pub location: GeoPoint,
    pub entry_count: u64,
    pub excluded_count: u64,
}

impl NormalizedRecord {
    pub fn day_of_week(&self) -> DayOfWeek {
        self.timestamp.weekday().into()
    }

    pub fn hour_of_day(&self) -> u32 {
        self.timestamp.hour()
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monday_is_zero() {
        assert_eq!(DayOfWeek::Monday.index(), 0);
        assert_eq!(DayOfWeek::Sunday.index(), 6);
        assert_eq!(DayOfWeek::from(Weekday::Sun), DayOfWeek::Sunday);
        assert_eq!(DayOfWeek::from(Weekday::Mon), DayOfWeek::Monday);
    }

    #[test]
    fn test_parse_day_labels() {
        assert_eq!("Thursday".parse::<DayOfWeek>(), Ok(DayOfWeek::Thursday));
        assert_eq!("thu".parse::<DayOfWeek>(), Ok(DayOfWeek::Thursday));
        assert_eq!(" SAT ".parse::<DayOfWeek>(), Ok(DayOfWeek::Saturday));
        assert!("Caturday".parse::<DayOfWeek>().is_err());
        assert!("".parse::<DayOfWeek>().is_err());
    }

    #[test]
    fn test_derived_fields() {
        // 2025-01-02 was a Thursday.
        let record = NormalizedRecord {
            timestamp: NaiveDate::from_ymd_opt(2025, 1, 2)
                .unwrap()
                .and_hms_opt(8, 30, 0)
                .unwrap(),
            vehicle_class: "1 - Cars, Pickups and Vans".into(),
            time_period: Some("Peak".into()),
            region: "Holland Tunnel".into(),
            location: GeoPoint::new(40.7256, -74.0119),
            entry_count: 10,
            excluded_count: 0,
        };
        assert_eq!(record.day_of_week(), DayOfWeek::Thursday);
        assert_eq!(record.hour_of_day(), 8);
        assert_eq!(record.date(), NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
    }
}
