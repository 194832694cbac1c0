//! Storage module for persisting crawl progress
//!
//! This module handles the crawl frontier and its durable state:
//! - The score-ordered, deduplicating [`Frontier`]
//! - The persisted JSON layout and migrations from older layouts
//! - Pluggable persistence backends (JSON file, in-memory)

mod file_store;
mod frontier;
mod memory_store;
pub mod schema;
mod traits;

pub use file_store::JsonFileStore;
pub use frontier::Frontier;
pub use memory_store::MemoryStore;
pub use schema::FrontierDocument;
pub use traits::{FrontierError, FrontierResult, FrontierStore};

use crate::config::FrontierConfig;
use serde::{Deserialize, Serialize};

/// An address waiting to be crawled
///
/// Identity is the address exactly as given; no normalization is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub address: String,
    pub depth: u32,
    pub score: f64,
}

impl WorkItem {
    pub fn new(address: impl Into<String>, depth: u32, score: f64) -> Self {
        Self {
            address: address.into(),
            depth,
            score,
        }
    }

    /// A depth-0, score-0 item for a seed address
    pub fn seed(address: impl Into<String>) -> Self {
        Self::new(address, 0, 0.0)
    }
}

/// Opens the file-backed frontier described by `config`
///
/// # Example
///
/// ```no_run
/// use minima::config::FrontierConfig;
/// use minima::storage::{open_frontier, WorkItem};
///
/// let mut frontier = open_frontier(&FrontierConfig::default());
/// frontier.add(WorkItem::seed("https://example.com/"));
/// ```
pub fn open_frontier(config: &FrontierConfig) -> Frontier {
    Frontier::open(JsonFileStore::new(&config.path), config.flush_every)
}

/// Reads the file-backed frontier described by `config` without touching disk
pub fn inspect_frontier(config: &FrontierConfig) -> Frontier {
    Frontier::inspect(JsonFileStore::new(&config.path))
}
