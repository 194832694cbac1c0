use crate::config::types::{Config, CrawlerConfig, FetchConfig, FrontierConfig, OutputConfig};
use crate::crawler::plugin_registry;
use crate::ConfigError;
use reqwest::header::{HeaderName, HeaderValue};
use url::Url;

/// One hour, the longest wait the fetcher will honor
const MAX_BACKOFF_MS: u64 = 3_600_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_fetch_config(&config.fetch)?;
    validate_frontier_config(&config.frontier)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Drops invalid seeds and unknown plugins, keeping the rest of the list
///
/// Returns one error per entry removed.
pub fn prune_invalid_entries(config: &mut Config) -> Vec<ConfigError> {
    let mut removed = Vec::new();

    config.crawler.seeds.retain(|seed| match validate_seed(seed) {
        Ok(()) => true,
        Err(e) => {
            removed.push(e);
            false
        }
    });

    config.crawler.plugins.retain(|name| match validate_plugin(name) {
        Ok(()) => true,
        Err(e) => {
            removed.push(e);
            false
        }
    });

    removed
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    for seed in &config.seeds {
        validate_seed(seed)?;
    }

    for name in &config.plugins {
        validate_plugin(name)?;
    }

    Ok(())
}

fn validate_seed(seed: &str) -> Result<(), ConfigError> {
    let url = Url::parse(seed)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' must use http or https",
            seed
        )));
    }

    Ok(())
}

fn validate_plugin(name: &str) -> Result<(), ConfigError> {
    if plugin_registry().contains(&name) {
        Ok(())
    } else {
        Err(ConfigError::UnknownPlugin(name.to_string()))
    }
}

/// Validates HTTP retrieval configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.max_workers < 1 || config.max_workers > 100 {
        return Err(ConfigError::Validation(format!(
            "max-workers must be between 1 and 100, got {}",
            config.max_workers
        )));
    }

    if config.retries < 1 {
        return Err(ConfigError::Validation(format!(
            "retries must be >= 1, got {}",
            config.retries
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    for (key, millis) in [
        ("backoff-base-ms", config.backoff_base_ms),
        ("transport-backoff-ms", config.transport_backoff_ms),
    ] {
        if millis > MAX_BACKOFF_MS {
            return Err(ConfigError::Validation(format!(
                "{} must be <= {}, got {}",
                key, MAX_BACKOFF_MS, millis
            )));
        }
    }

    if config.preview_bytes < 1 {
        return Err(ConfigError::Validation(
            "preview-bytes must be >= 1".to_string(),
        ));
    }

    for (name, value) in &config.headers {
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ConfigError::Validation(format!("Invalid header name '{}'", name)))?;
        HeaderValue::from_str(value).map_err(|_| {
            ConfigError::Validation(format!("Invalid value for header '{}'", name))
        })?;
    }

    Ok(())
}

/// Validates frontier persistence configuration
fn validate_frontier_config(config: &FrontierConfig) -> Result<(), ConfigError> {
    if config.path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "frontier path cannot be empty".to_string(),
        ));
    }

    if config.flush_every < 1 {
        return Err(ConfigError::Validation(format!(
            "flush-every must be >= 1, got {}",
            config.flush_every
        )));
    }

    Ok(())
}

/// Validates export configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.flush_threshold < 1 {
        return Err(ConfigError::Validation(format!(
            "flush-threshold must be >= 1, got {}",
            config.flush_threshold
        )));
    }

    validate_prefix(&config.prefix)
}

/// The prefix doubles as a SQLite table name
fn validate_prefix(prefix: &str) -> Result<(), ConfigError> {
    if prefix.is_empty() {
        return Err(ConfigError::Validation("prefix cannot be empty".to_string()));
    }

    if prefix.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(ConfigError::Validation(format!(
            "prefix '{}' cannot start with a digit",
            prefix
        )));
    }

    if !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ConfigError::Validation(format!(
            "prefix must contain only ASCII letters, digits and underscores, got '{}'",
            prefix
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_rejects_worker_bounds() {
        let mut config = Config::default();
        config.fetch.max_workers = 0;
        assert!(validate(&config).is_err());

        config.fetch.max_workers = 101;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_oversized_backoff() {
        let mut config = Config::default();
        config.fetch.backoff_base_ms = u64::MAX;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));

        let mut config = Config::default();
        config.fetch.transport_backoff_ms = 3_600_001;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.fetch.backoff_base_ms = 3_600_000;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_rejects_zero_retries() {
        let mut config = Config::default();
        config.fetch.retries = 0;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_rejects_bad_seed() {
        let mut config = Config::default();
        config.crawler.seeds = vec!["not a url".to_string()];
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));

        config.crawler.seeds = vec!["ftp://example.com/file".to_string()];
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_accepts_http_and_https_seeds() {
        let mut config = Config::default();
        config.crawler.seeds = vec![
            "http://example.com/".to_string(),
            "https://example.org/wiki/España".to_string(),
        ];
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_prune_keeps_valid_entries() {
        let mut config = Config::default();
        config.crawler.seeds = vec![
            "https://example.com/".to_string(),
            "not a url".to_string(),
            "ftp://example.com/file".to_string(),
        ];
        config.crawler.plugins = vec!["teleport".to_string(), "word_count".to_string()];

        let removed = prune_invalid_entries(&mut config);

        assert_eq!(removed.len(), 3);
        assert_eq!(config.crawler.seeds, vec!["https://example.com/"]);
        assert_eq!(config.crawler.plugins, vec!["word_count"]);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_rejects_unknown_plugin() {
        let mut config = Config::default();
        config.crawler.plugins = vec!["word_count".to_string(), "teleport".to_string()];
        assert!(matches!(
            validate(&config),
            Err(ConfigError::UnknownPlugin(name)) if name == "teleport"
        ));
    }

    #[test]
    fn test_rejects_bad_prefix() {
        for prefix in ["", "1results", "drop table", "a-b"] {
            let mut config = Config::default();
            config.output.prefix = prefix.to_string();
            assert!(validate(&config).is_err(), "prefix {:?} should fail", prefix);
        }
    }

    #[test]
    fn test_rejects_zero_flush_cadence() {
        let mut config = Config::default();
        config.frontier.flush_every = 0;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.output.flush_threshold = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_bad_header() {
        let mut config = Config::default();
        config
            .fetch
            .headers
            .insert("Bad Header".to_string(), "x".to_string());
        assert!(validate(&config).is_err());
    }
}
