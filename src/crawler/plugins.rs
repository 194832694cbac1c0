//! Per-page enrichment plugins
//!
//! A plugin sees the address and body of every accepted page and may return
//! extra fields merged into its export record. Plugins are isolated: an error
//! or panic in one is logged and the page is exported without its fields.

use crate::crawler::parser::extract_text;
use crate::output::ExportRecord;
use crate::ConfigError;
use scraper::{Html, Selector};
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

/// Failure reported by a plugin
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("{plugin} failed: {message}")]
    Failed { plugin: String, message: String },
}

impl PluginError {
    pub fn failed(plugin: &str, message: impl Into<String>) -> Self {
        Self::Failed {
            plugin: plugin.to_string(),
            message: message.into(),
        }
    }
}

/// A per-page enrichment step
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Extra fields for the page, or `None` when the plugin has nothing to add
    fn process(&self, address: &str, body: &str) -> Result<Option<ExportRecord>, PluginError>;
}

const REGISTRY: &[&str] = &[WordCountPlugin::NAME, MetaDescriptionPlugin::NAME];

/// Names accepted in the `plugins` configuration list
pub fn plugin_registry() -> &'static [&'static str] {
    REGISTRY
}

/// Builds the built-in plugin registered under `name`
fn builtin(name: &str) -> Option<Box<dyn Plugin>> {
    match name {
        WordCountPlugin::NAME => Some(Box::new(WordCountPlugin)),
        MetaDescriptionPlugin::NAME => Some(Box::new(MetaDescriptionPlugin)),
        _ => None,
    }
}

/// Ordered set of plugins applied to every accepted page
#[derive(Default)]
pub struct PluginSet {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiates the built-in plugins named in `names`, in order
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, ConfigError> {
        let mut set = Self::new();
        for name in names {
            let plugin = builtin(name.as_ref())
                .ok_or_else(|| ConfigError::UnknownPlugin(name.as_ref().to_string()))?;
            set.register(plugin);
        }
        Ok(set)
    }

    pub fn register(&mut self, plugin: Box<dyn Plugin>) {
        tracing::debug!("Registered plugin {}", plugin.name());
        self.plugins.push(plugin);
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Runs every plugin and merges their fields into `record`
    ///
    /// Returns the number of plugins that failed.
    pub fn apply(&self, address: &str, body: &str, record: &mut ExportRecord) -> usize {
        let mut failures = 0;

        for plugin in &self.plugins {
            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| plugin.process(address, body)));

            match outcome {
                Ok(Ok(Some(extra))) => record.merge(extra),
                Ok(Ok(None)) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    tracing::warn!("Plugin error on {}: {}", address, e);
                }
                Err(_) => {
                    failures += 1;
                    tracing::error!("Plugin {} panicked on {}", plugin.name(), address);
                }
            }
        }

        failures
    }
}

/// Adds `word_count`: whitespace-separated words of the visible body text
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCountPlugin;

impl WordCountPlugin {
    pub const NAME: &'static str = "word_count";
}

impl Plugin for WordCountPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn process(&self, _address: &str, body: &str) -> Result<Option<ExportRecord>, PluginError> {
        let words = extract_text(body).split_whitespace().count();
        let mut extra = ExportRecord::new();
        extra.insert("word_count", words);
        Ok(Some(extra))
    }
}

/// Adds `description` from `<meta name="description">` when present
#[derive(Debug, Clone, Copy, Default)]
pub struct MetaDescriptionPlugin;

impl MetaDescriptionPlugin {
    pub const NAME: &'static str = "meta_description";
}

impl Plugin for MetaDescriptionPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn process(&self, _address: &str, body: &str) -> Result<Option<ExportRecord>, PluginError> {
        let selector = Selector::parse("meta[name][content]")
            .map_err(|_| PluginError::failed(Self::NAME, "invalid selector"))?;
        let document = Html::parse_document(body);

        let description = document
            .select(&selector)
            .find(|element| {
                element
                    .value()
                    .attr("name")
                    .map(|name| name.eq_ignore_ascii_case("description"))
                    .unwrap_or(false)
            })
            .and_then(|element| element.value().attr("content"))
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty());

        Ok(description.map(|description| {
            let mut extra = ExportRecord::new();
            extra.insert("description", description);
            extra
        }))
    }
}
