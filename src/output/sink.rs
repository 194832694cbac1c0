//! Buffered multi-format result sink
//!
//! Accepted records are buffered in memory and written to every configured
//! [`RecordWriter`] when the buffer reaches the flush threshold, when
//! [`ResultSink::flush`] is called, or when the sink is dropped.
//!
//! A format that fails keeps its own backlog of the records it missed; the
//! backlog is written ahead of new records on the next flush, so every format
//! eventually holds every flushed record.

use crate::config::OutputConfig;
use crate::output::csv_output::CsvWriter;
use crate::output::json_output::JsonWriter;
use crate::output::sqlite_output::SqliteStoreWriter;
use crate::output::traits::{ExportTarget, OutputResult, RecordWriter};
use crate::output::ExportRecord;
use chrono::Local;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// Outcome of one flush
#[derive(Debug, Default, Clone)]
pub struct FlushReport {
    /// Number of new records taken from the buffer
    pub records: usize,

    /// Locations written successfully
    pub written: Vec<PathBuf>,

    /// Formats that failed, with the error message
    pub failures: Vec<(&'static str, String)>,
}

impl FlushReport {
    /// True when every format received the batch
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A writer and the records it has not yet received
struct Channel {
    writer: Box<dyn RecordWriter>,
    backlog: Vec<ExportRecord>,
    delivered: usize,
}

pub struct ResultSink {
    prefix: String,
    flush_threshold: usize,
    channels: Vec<Channel>,
    buffer: Vec<ExportRecord>,
    sequence: AtomicU64,
}

impl ResultSink {
    /// Sink writing JSON and CSV to the export directory and the keyed store
    /// to the store directory
    pub fn new(config: &OutputConfig) -> Self {
        let writers: Vec<Box<dyn RecordWriter>> = vec![
            Box::new(JsonWriter::new(&config.export_dir)),
            Box::new(CsvWriter::new(&config.export_dir)),
            Box::new(SqliteStoreWriter::new(&config.store_dir)),
        ];
        Self::with_writers(&config.prefix, config.flush_threshold, writers)
    }

    pub fn with_writers(
        prefix: impl Into<String>,
        flush_threshold: usize,
        writers: Vec<Box<dyn RecordWriter>>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            flush_threshold: flush_threshold.max(1),
            channels: writers
                .into_iter()
                .map(|writer| Channel {
                    writer,
                    backlog: Vec::new(),
                    delivered: 0,
                })
                .collect(),
            buffer: Vec::new(),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn add_record(&mut self, record: ExportRecord) -> Option<FlushReport> {
        self.add_records(std::iter::once(record))
    }

    /// Buffers `records`, flushing once the threshold is reached
    ///
    /// Returns the report of the automatic flush, if one happened.
    pub fn add_records(
        &mut self,
        records: impl IntoIterator<Item = ExportRecord>,
    ) -> Option<FlushReport> {
        self.buffer.extend(records);

        if self.buffer.len() >= self.flush_threshold {
            tracing::debug!(
                "Buffer reached {} records (threshold {}), flushing",
                self.buffer.len(),
                self.flush_threshold
            );
            Some(self.flush())
        } else {
            None
        }
    }

    /// Writes the buffer, plus any backlog, to every format
    ///
    /// Each format is attempted independently. A format that fails keeps the
    /// batch as its backlog and retries it on the next flush.
    pub fn flush(&mut self) -> FlushReport {
        if self.is_empty() {
            return FlushReport::default();
        }

        let target = self.next_target(&self.prefix);
        let fresh = std::mem::take(&mut self.buffer);
        let mut report = FlushReport {
            records: fresh.len(),
            ..FlushReport::default()
        };

        let mut attempted = 0;
        for channel in &mut self.channels {
            channel.backlog.extend(fresh.iter().cloned());
            if channel.backlog.is_empty() {
                continue;
            }
            attempted += 1;

            match channel.writer.write(&channel.backlog, &target) {
                Ok(path) => {
                    channel.delivered += channel.backlog.len();
                    channel.backlog.clear();
                    report.written.push(path);
                }
                Err(e) => {
                    tracing::warn!(
                        "{} export failed, {} records held for retry: {}",
                        channel.writer.format(),
                        channel.backlog.len(),
                        e
                    );
                    report.failures.push((channel.writer.format(), e.to_string()));
                }
            }
        }

        if attempted > 0 && report.written.is_empty() {
            tracing::error!(
                "Every export format failed, keeping {} records buffered",
                self.len()
            );
        } else {
            tracing::info!(
                "Flushed {} records to {} location(s)",
                report.records,
                report.written.len()
            );
        }

        report
    }

    /// Writes `records` to every format immediately, bypassing the buffer
    pub fn write_snapshot(
        &self,
        records: &[ExportRecord],
        base_name: &str,
    ) -> OutputResult<Vec<PathBuf>> {
        let target = self.next_target(base_name);
        let mut written = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            written.push(channel.writer.write(records, &target)?);
        }
        Ok(written)
    }

    /// Records added since the last flush
    pub fn buffered(&self) -> &[ExportRecord] {
        &self.buffer
    }

    /// Records not yet written to every format
    pub fn len(&self) -> usize {
        self.buffer.len() + self.backlog()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Largest number of flushed records some format still owes
    pub fn backlog(&self) -> usize {
        self.channels
            .iter()
            .map(|channel| channel.backlog.len())
            .max()
            .unwrap_or(0)
    }

    /// Records written by at least one format so far
    pub fn exported(&self) -> usize {
        self.channels
            .iter()
            .map(|channel| channel.delivered)
            .max()
            .unwrap_or(0)
    }

    fn next_target(&self, base_name: &str) -> ExportTarget {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let now = Local::now();
        ExportTarget {
            base_name: base_name.to_string(),
            stamp: format!("{}_{:04}", now.format("%Y%m%d_%H%M%S_%3f"), seq),
            day: now.format("%Y%m%d").to_string(),
        }
    }
}

impl Drop for ResultSink {
    fn drop(&mut self) {
        if !self.is_empty() {
            tracing::info!("Flushing {} buffered records on shutdown", self.len());
            self.flush();
        }
    }
}
