//! JSON export: one pretty-printed UTF-8 array per write

use crate::output::traits::{ExportTarget, OutputResult, RecordWriter};
use crate::output::ExportRecord;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Writes `<dir>/<base>_<stamp>.json`
#[derive(Debug, Clone)]
pub struct JsonWriter {
    dir: PathBuf,
}

impl JsonWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl RecordWriter for JsonWriter {
    fn format(&self) -> &'static str {
        "json"
    }

    fn write(&self, records: &[ExportRecord], target: &ExportTarget) -> OutputResult<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self
            .dir
            .join(format!("{}_{}.json", target.base_name, target.stamp));

        let mut writer = BufWriter::new(File::create(&path)?);
        // serde_json leaves non-ASCII characters unescaped
        serde_json::to_writer_pretty(&mut writer, records)?;
        writer.flush()?;

        tracing::info!("JSON export -> {} ({} records)", path.display(), records.len());
        Ok(path)
    }
}
