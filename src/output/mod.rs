//! Output module for exporting crawl results
//!
//! This module handles:
//! - The open [`ExportRecord`] produced for every accepted page
//! - Buffered delivery of records through the [`ResultSink`]
//! - JSON, CSV and day-grouped SQLite writers
//! - Run statistics

mod csv_output;
mod json_output;
mod record;
mod sink;
pub mod sqlite_output;
pub mod stats;
mod traits;

pub use csv_output::CsvWriter;
pub use json_output::JsonWriter;
pub use record::{value_to_text, ExportRecord};
pub use sink::{FlushReport, ResultSink};
pub use sqlite_output::SqliteStoreWriter;
pub use stats::{print_frontier_status, print_statistics, CrawlStatistics};
pub use traits::{ExportTarget, OutputError, OutputResult, RecordWriter};
