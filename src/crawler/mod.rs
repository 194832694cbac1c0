//! Crawler module for fetching and processing pages
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic and preview fetches
//! - HTML analysis, language detection and link resolution
//! - Per-page plugins and relevance scoring
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod parser;
mod plugins;
mod scoring;

pub use coordinator::{run_crawl, Coordinator, RunStatus};
pub use fetcher::{build_http_client, FetchError, FetchResult, Fetcher};
pub use parser::{extract_text, resolve_link, ContentAnalyzer, HtmlAnalyzer, UNKNOWN_LANGUAGE};
pub use plugins::{
    plugin_registry, MetaDescriptionPlugin, Plugin, PluginError, PluginSet, WordCountPlugin,
};
pub use scoring::{scoring_policy, OriginScore, ScoringPolicy, WeightedFeatures};
