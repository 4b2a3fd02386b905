//! Input column mapping and process settings.

use crate::error::LoadError;
use serde::{Deserialize, Serialize};

/// Maps logical fields to header names in the source CSV.
///
/// Defaults match the MTA "CRZ Vehicle Entries" export. Stored on disk as
/// JSON; any omitted key keeps its default:
/// ```json
/// { "date": "Toll Date", "count": "CRZ Entries" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub date: String,
    pub hour: String,
    /// Optional column; rows resolve to the top of the hour when absent.
    pub minute: Option<String>,
    pub time_period: String,
    pub vehicle_class: String,
    pub region: String,
    pub count: String,
    /// Optional column.
    pub excluded: Option<String>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            date: "Toll Date".into(),
            hour: "Hour of Day".into(),
            minute: Some("Minute of Hour".into()),
            time_period: "Time Period".into(),
            vehicle_class: "Vehicle Class".into(),
            region: "Detection Region".into(),
            count: "CRZ Entries".into(),
            excluded: Some("Excluded Roadway Entries".into()),
        }
    }
}

impl ColumnMapping {
    pub fn load(path: &str) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Paths picked up from the environment (and `.env`), overridable on the CLI.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub csv_path: Option<String>,
    pub entry_points_path: Option<String>,
    pub columns_path: Option<String>,
    pub log_file_path: String,
}

impl Settings {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            csv_path: std::env::var("CRZ_CSV_PATH").ok(),
            entry_points_path: std::env::var("CRZ_ENTRY_POINTS_PATH").ok(),
            columns_path: std::env::var("CRZ_COLUMNS_PATH").ok(),
            log_file_path: std::env::var("LOG_FILE_PATH")
                .unwrap_or_else(|_| "logs/crz_heatmap.log".to_string()),
        }
    }
}
