//! In-memory frontier store
//!
//! Used by tests and embedders that do not need durability. Clones share the
//! same underlying document, so a test can keep a handle and inspect what the
//! frontier last persisted.

use crate::storage::schema::{FrontierDocument, RawDocument};
use crate::storage::traits::{FrontierError, FrontierResult, FrontierStore};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Shared {
    document: Option<FrontierDocument>,
    saves: usize,
    fail_writes: bool,
}

/// Frontier store holding the persisted document in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last document written by the frontier
    pub fn document(&self) -> Option<FrontierDocument> {
        self.shared.lock().ok().and_then(|s| s.document.clone())
    }

    /// Number of completed saves
    pub fn saves(&self) -> usize {
        self.shared.lock().map(|s| s.saves).unwrap_or(0)
    }

    /// Makes every subsequent save fail, simulating a full or read-only disk
    pub fn set_fail_writes(&self, fail: bool) {
        if let Ok(mut shared) = self.shared.lock() {
            shared.fail_writes = fail;
        }
    }
}

impl FrontierStore for MemoryStore {
    fn load(&self) -> FrontierResult<Option<RawDocument>> {
        let shared = self
            .shared
            .lock()
            .map_err(|e| FrontierError::Unavailable(e.to_string()))?;
        Ok(shared.document.clone().map(RawDocument::from))
    }

    fn save(&mut self, document: &FrontierDocument) -> FrontierResult<()> {
        let mut shared = self
            .shared
            .lock()
            .map_err(|e| FrontierError::Unavailable(e.to_string()))?;

        if shared.fail_writes {
            return Err(FrontierError::Unavailable("writes disabled".to_string()));
        }

        shared.document = Some(document.clone());
        shared.saves += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
