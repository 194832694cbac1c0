//! CSV export
//!
//! The header comes from the first record's keys. Later records are coerced
//! to that header: missing keys become empty cells and extra keys are dropped.
//! An empty batch produces a zero-byte file.

use crate::output::traits::{ExportTarget, OutputResult, RecordWriter};
use crate::output::ExportRecord;
use std::fs::{self, File};
use std::path::PathBuf;

/// Writes `<dir>/<base>_<stamp>.csv`
#[derive(Debug, Clone)]
pub struct CsvWriter {
    dir: PathBuf,
}

impl CsvWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl RecordWriter for CsvWriter {
    fn format(&self) -> &'static str {
        "csv"
    }

    fn write(&self, records: &[ExportRecord], target: &ExportTarget) -> OutputResult<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self
            .dir
            .join(format!("{}_{}.csv", target.base_name, target.stamp));

        let Some(first) = records.first() else {
            tracing::warn!("No results to export in CSV, writing empty {}", path.display());
            File::create(&path)?;
            return Ok(path);
        };

        let header: Vec<String> = first.keys().cloned().collect();
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(&header)?;

        for record in records {
            let extra = record.keys().filter(|k| !header.contains(k)).count();
            if extra > 0 {
                tracing::debug!("Dropping {} field(s) outside the CSV header", extra);
            }

            let row: Vec<String> = header
                .iter()
                .map(|key| record.text(key).unwrap_or_default())
                .collect();
            writer.write_record(&row)?;
        }
        writer.flush()?;

        tracing::info!("CSV export -> {} ({} records)", path.display(), records.len());
        Ok(path)
    }
}
