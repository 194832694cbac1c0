//! Output writer traits and error types
//!
//! This module defines the trait interface for record writers and the
//! naming information handed to them on every write.

use crate::output::ExportRecord;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to write {format} output: {message}")]
    Write {
        format: &'static str,
        message: String,
    },
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Naming information for one write
///
/// `stamp` is unique per write (second-resolution time, milliseconds and a
/// sequence number); `day` groups keyed-store writes by calendar day.
#[derive(Debug, Clone)]
pub struct ExportTarget {
    /// File name prefix and table name
    pub base_name: String,

    /// `YYYYMMDD_HHMMSS_mmm_seq`
    pub stamp: String,

    /// `YYYYMMDD`
    pub day: String,
}

/// One persistent form of exported records
pub trait RecordWriter: Send {
    /// Short format name used in logs and reports
    fn format(&self) -> &'static str;

    /// Writes `records` and returns the location written
    ///
    /// An empty batch is valid and still produces a location.
    fn write(&self, records: &[ExportRecord], target: &ExportTarget) -> OutputResult<PathBuf>;
}
