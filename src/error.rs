//! Error types for scanning, measuring and reporting
//!
//! `ReportError` aborts a report run. `MeasureError` is recovered by the
//! dataset builder, which downgrades the affected record to
//! "Failed to get size" and keeps going.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors while building or writing a report
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to read build record {path}: {source}")]
    MarkerRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed build record {path}: {source}")]
    MarkerParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to traverse results directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Failed to write report {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Recoverable failures while measuring a compiled artifact
#[derive(Error, Debug)]
pub enum MeasureError {
    #[error("Failed to run {tool}: {source}")]
    ToolSpawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {status} for {path}")]
    ToolFailed {
        tool: String,
        status: String,
        path: PathBuf,
    },

    #[error("Size output has no '{field}: <n> bytes' line")]
    MissingField { field: &'static str },

    #[error("Size output has more than one '{field}: <n> bytes' line")]
    DuplicateField { field: &'static str },

    #[error("Size value for '{field}' out of range: {value}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Failed to read artifact {path}: {source}")]
    ArtifactRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Invalid or unreadable tool configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Result type for report operations
pub type Result<T> = std::result::Result<T, ReportError>;
