//! Storage traits and error types
//!
//! This module defines the trait interface for frontier persistence backends
//! and associated error types.

use crate::storage::schema::{FrontierDocument, RawDocument};
use thiserror::Error;

/// Errors that can occur while reading or writing frontier state
#[derive(Debug, Error)]
pub enum FrontierError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for frontier storage operations
pub type FrontierResult<T> = Result<T, FrontierError>;

/// Trait for frontier persistence backends
///
/// A store only moves documents in and out; reconciliation and migration are
/// applied by the frontier itself so every backend behaves the same.
pub trait FrontierStore: Send {
    /// Reads the persisted document
    ///
    /// # Returns
    ///
    /// * `Ok(Some(doc))` - State was found
    /// * `Ok(None)` - Nothing has been persisted yet
    /// * `Err(FrontierError)` - State exists but could not be read
    fn load(&self) -> FrontierResult<Option<RawDocument>>;

    /// Replaces the persisted document
    ///
    /// Implementations must leave the previous document intact when the
    /// write does not complete.
    fn save(&mut self, document: &FrontierDocument) -> FrontierResult<()>;

    /// Human-readable location for log lines
    fn describe(&self) -> String;
}
