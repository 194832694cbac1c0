//! Configuration module for Minima
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! A missing or broken file is never fatal: [`load_config_or_default`] falls back
//! to the built-in defaults and logs a warning.
//!
//! # Example
//!
//! ```no_run
//! use minima::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("minima.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlMode, CrawlerConfig, FetchConfig, FrontierConfig, OutputConfig, ScoringKind,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_or_default, load_config_with_hash};
pub use validation::{prune_invalid_entries, validate};
