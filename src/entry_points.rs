//! Static lookup table from detection-region label to coordinates.

use crate::error::LoadError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A (latitude, longitude) pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Latitude in [-90, 90], longitude in [-180, 180], both finite.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A named entry point into the zone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryPoint {
    pub name: String,
    pub location: GeoPoint,
}

/// Labels and coordinates known to the MTA entry dataset.
///
/// Several labels share a location because the dataset names the same
/// crossing in more than one way.
const NYC_ENTRY_POINTS: &[(&str, f64, f64)] = &[
    ("Brooklyn", 40.7061, -73.9969),
    ("Queens", 40.7570, -73.9543),
    ("Queens Midtown Tunnel", 40.7440, -73.9713),
    ("West Side Highway", 40.7713, -73.9916),
    ("West 60th St", 40.7690, -73.9851),
    ("Manhattan Bridge", 40.7075, -73.9903),
    ("Lincoln Tunnel", 40.7608, -74.0021),
    ("Holland Tunnel", 40.7256, -74.0119),
    ("FDR Drive", 40.7625, -73.9595),
    ("East 60th St", 40.7625, -73.9595),
    ("New Jersey", 40.7608, -74.0021),
    ("Brooklyn Battery Tunnel", 40.7001, -74.0145),
    ("Battery Tunnel", 40.7001, -74.0145),
    ("Hugh L. Carey Tunnel", 40.7001, -74.0145),
    ("Williamsburg Bridge", 40.7131, -73.9722),
    ("Brooklyn Bridge", 40.7061, -73.9969),
    ("Manhattan", 40.7075, -73.9903),
    ("Queensboro Bridge", 40.7570, -73.9543),
    ("Queens Tunnel", 40.7440, -73.9713),
    ("Midtown Tunnel", 40.7440, -73.9713),
    ("Holland", 40.7256, -74.0119),
    ("Brooklyn Tunnel", 40.7001, -74.0145),
    ("Williamsburg", 40.7131, -73.9722),
];

/// Immutable name → location table, validated on construction.
///
/// Lookups are exact and case-sensitive.
///
/// Stored on disk as a plain JSON object:
/// ```json
/// {
///   "Holland Tunnel": [40.7256, -74.0119],
///   "Lincoln Tunnel": [40.7608, -74.0021]
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct EntryPointTable {
    entries: HashMap<String, GeoPoint>,
}

impl EntryPointTable {
    /// Builds a table, rejecting duplicate names and out-of-range coordinates.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, LoadError>
    where
        I: IntoIterator<Item = (S, GeoPoint)>,
        S: Into<String>,
    {
        let mut map = HashMap::new();
        for (name, location) in entries {
            let name = name.into();
            if !location.is_valid() {
                return Err(LoadError::InvalidCoordinates {
                    name,
                    latitude: location.latitude,
                    longitude: location.longitude,
                });
            }
            if map.contains_key(&name) {
                return Err(LoadError::DuplicateEntryPoint(name));
            }
            map.insert(name, location);
        }
        Ok(Self { entries: map })
    }

    /// The built-in table of NYC congestion-zone crossings.
    pub fn nyc() -> Self {
        let entries = NYC_ENTRY_POINTS
            .iter()
            .map(|&(name, lat, lon)| (name.to_string(), GeoPoint::new(lat, lon)))
            .collect();
        Self { entries }
    }

    /// Loads the table from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, LoadError> {
        let raw: HashMap<String, (f64, f64)> = serde_json::from_str(content)?;
        Self::from_entries(
            raw.into_iter()
                .map(|(name, (lat, lon))| (name, GeoPoint::new(lat, lon))),
        )
    }

    pub fn get(&self, name: &str) -> Option<GeoPoint> {
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry points sorted by name.
    pub fn entry_points(&self) -> Vec<EntryPoint> {
        let mut points: Vec<_> = self
            .entries
            .iter()
            .map(|(name, location)| EntryPoint {
                name: name.clone(),
                location: *location,
            })
            .collect();
        points.sort_by(|a, b| a.name.cmp(&b.name));
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nyc_table_contains_holland_tunnel() {
        let table = EntryPointTable::nyc();
        assert_eq!(
            table.get("Holland Tunnel"),
            Some(GeoPoint::new(40.7256, -74.0119))
        );
        assert_eq!(table.len(), NYC_ENTRY_POINTS.len());
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let table = EntryPointTable::nyc();
        assert!(table.get("holland tunnel").is_none());
        assert!(table.get("Holland Tunnel ").is_none());
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let result = EntryPointTable::from_entries(vec![
            ("A", GeoPoint::new(1.0, 1.0)),
            ("A", GeoPoint::new(2.0, 2.0)),
        ]);
        assert!(matches!(result, Err(LoadError::DuplicateEntryPoint(n)) if n == "A"));
    }

    #[test]
    fn test_rejects_out_of_range_coordinates() {
        let result = EntryPointTable::from_entries(vec![("North", GeoPoint::new(91.0, 0.0))]);
        assert!(matches!(result, Err(LoadError::InvalidCoordinates { .. })));

        let result = EntryPointTable::from_entries(vec![("East", GeoPoint::new(0.0, 180.5))]);
        assert!(matches!(result, Err(LoadError::InvalidCoordinates { .. })));

        let result = EntryPointTable::from_entries(vec![("Nan", GeoPoint::new(f64::NAN, 0.0))]);
        assert!(matches!(result, Err(LoadError::InvalidCoordinates { .. })));
    }

    #[test]
    fn test_from_json() {
        let table =
            EntryPointTable::from_json(r#"{"Holland Tunnel": [40.7256, -74.0119]}"#).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("Holland Tunnel").unwrap().latitude, 40.7256);
    }

    #[test]
    fn test_from_json_validates() {
        let result = EntryPointTable::from_json(r#"{"Bad": [100.0, 0.0]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_entry_points_sorted_by_name() {
        let names: Vec<_> = EntryPointTable::nyc()
            .entry_points()
            .into_iter()
            .map(|e| e.name)
            .collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
