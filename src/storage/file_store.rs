//! JSON file frontier store
//!
//! Writes go to a `.tmp` sibling that is renamed over the target, so an
//! interrupted write leaves the last completed state on disk.

use crate::storage::schema::{FrontierDocument, RawDocument};
use crate::storage::traits::{FrontierResult, FrontierStore};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Frontier store backed by a single pretty-printed JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Creates a store writing to `path`
    ///
    /// The parent directory is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "frontier.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl FrontierStore for JsonFileStore {
    fn load(&self) -> FrontierResult<Option<RawDocument>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        let raw: RawDocument = serde_json::from_str(&content)?;
        Ok(Some(raw))
    }

    fn save(&mut self, document: &FrontierDocument) -> FrontierResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp = self.temp_path();
        {
            let file = fs::File::create(&temp)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, document)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&temp, &self.path)?;

        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
