//! Error types for loading data and running queries.
//!
//! Row-level problems are not errors here: they are reported as
//! [`crate::normalize::Rejection`]s and the batch carries on.

use thiserror::Error;

/// Failures while loading input files or reference tables.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required column is not present in the header row.
    #[error("input is missing required column: '{0}'")]
    MissingColumn(String),

    #[error("duplicate entry point name: '{0}'")]
    DuplicateEntryPoint(String),

    #[error("entry point '{name}' has invalid coordinates ({latitude}, {longitude})")]
    InvalidCoordinates {
        name: String,
        latitude: f64,
        longitude: f64,
    },
}

/// Contract violations on the query layer. These fail the whole call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("INVALID_GRANULARITY: {0}")]
    InvalidGranularity(String),

    #[error("INVALID_FILTER_SPEC: {0}")]
    InvalidFilterSpec(String),
}

impl QueryError {
    /// Taxonomy code for this error, e.g. `INVALID_GRANULARITY`.
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::InvalidGranularity(_) => "INVALID_GRANULARITY",
            QueryError::InvalidFilterSpec(_) => "INVALID_FILTER_SPEC",
        }
    }
}
