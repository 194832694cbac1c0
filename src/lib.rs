//! Minima: a resumable crawl/scrape pipeline
//!
//! This crate retrieves remote documents from seed addresses, extracts their
//! content, optionally follows discovered links up to a depth limit, and
//! persists the results as JSON, CSV and a day-grouped SQLite store.
//!
//! The engine is split into a persistent priority [`storage::Frontier`], a
//! bounded-concurrency [`crawler::Fetcher`], a buffered [`output::ResultSink`]
//! and the [`crawler::Coordinator`] that drives them round by round.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Minima operations
#[derive(Debug, Error)]
pub enum MinimaError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Frontier error: {0}")]
    Frontier(#[from] storage::FrontierError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid state transition for {address}: {from:?} -> {to:?}")]
    InvalidTransition {
        address: String,
        from: state::AddressState,
        to: state::AddressState,
    },

    /// Broken internal invariant; the only error class that aborts a crawl
    #[error("Internal invariant violated: {0}")]
    Invariant(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Unknown plugin: {0}")]
    UnknownPlugin(String),
}

/// Result type alias for Minima operations
pub type Result<T> = std::result::Result<T, MinimaError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_crawl, Coordinator, Fetcher, RunStatus};
pub use output::{ExportRecord, ResultSink};
pub use state::AddressState;
pub use storage::{Frontier, WorkItem};
