use crate::config::types::Config;
use crate::config::validation::{prune_invalid_entries, validate};
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so two runs can be told apart by their configuration.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Loads a configuration, falling back to the built-in defaults
///
/// Missing, unreadable or unparsable files are reported as a warning and
/// never abort the run. Invalid seeds and unknown plugins are dropped one by
/// one with a warning; any other invalid field falls back to the defaults.
pub fn load_config_or_default(path: &Path) -> Config {
    if !path.exists() {
        tracing::warn!(
            "Config file not found: {}, using built-in defaults",
            path.display()
        );
        return Config::default();
    }

    let parsed = std::fs::read_to_string(path)
        .map_err(ConfigError::from)
        .and_then(|content| toml::from_str::<Config>(&content).map_err(ConfigError::from));

    let mut config = match parsed {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(
                "Failed to load configuration from {}: {}, using built-in defaults",
                path.display(),
                e
            );
            return Config::default();
        }
    };

    for error in prune_invalid_entries(&mut config) {
        tracing::warn!("Ignoring config entry in {}: {}", path.display(), error);
    }

    if let Err(e) = validate(&config) {
        tracing::warn!(
            "Invalid configuration in {}: {}, using built-in defaults",
            path.display(),
            e
        );
        return Config::default();
    }

    match compute_config_hash(path) {
        Ok(hash) => tracing::info!(
            "Configuration loaded from {} (hash: {})",
            path.display(),
            hash
        ),
        Err(_) => tracing::info!("Configuration loaded from {}", path.display()),
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CrawlMode, ScoringKind};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[crawler]
mode = "crawl_and_scrape"
max-depth = 3
seeds = ["https://example.com/"]
accept-languages = ["en", "FR "]
plugins = ["word_count"]
scoring = "weighted"

[fetch]
max-workers = 8
retries = 4

[fetch.headers]
User-Agent = "TestBot/1.0"

[frontier]
path = "./queue.json"
flush-every = 10

[output]
prefix = "pages"
flush-threshold = 20
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.mode, CrawlMode::Crawl);
        assert_eq!(config.crawler.max_depth, 3);
        assert_eq!(config.crawler.scoring, ScoringKind::Weighted);
        assert_eq!(config.crawler.normalized_languages(), vec!["en", "fr"]);
        assert_eq!(config.fetch.max_workers, 8);
        assert_eq!(config.fetch.retries, 4);
        assert_eq!(config.fetch.headers.get("User-Agent").unwrap(), "TestBot/1.0");
        // Unspecified fields keep their defaults
        assert_eq!(config.fetch.timeout_secs, 10);
        assert_eq!(config.frontier.flush_every, 10);
        assert_eq!(config.output.prefix, "pages");
        assert_eq!(config.output.flush_threshold, 20);
    }

    #[test]
    fn test_empty_file_yields_defaults() {
        let file = create_temp_config("");
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.mode, CrawlMode::Scrape);
        assert_eq!(config.crawler.max_depth, 2);
        assert_eq!(config.fetch.max_workers, 5);
        assert_eq!(config.fetch.retries, 3);
        assert_eq!(config.output.prefix, "results");
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/minima.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = r#"
[fetch]
max-workers = 0
"#;

        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_fallback_on_missing_file() {
        let config = load_config_or_default(Path::new("/nonexistent/minima.toml"));
        assert_eq!(config.fetch.max_workers, 5);
    }

    #[test]
    fn test_fallback_on_invalid_file() {
        let file = create_temp_config("[crawler]\nmax-depth = \"deep\"");
        let config = load_config_or_default(file.path());
        assert_eq!(config.crawler.max_depth, 2);
    }

    #[test]
    fn test_fallback_drops_only_invalid_seed() {
        let file = create_temp_config(
            r#"
[crawler]
max-depth = 4
seeds = ["https://example.com/", "example.org without scheme"]
plugins = ["word_count", "sentiment"]
"#,
        );
        let config = load_config_or_default(file.path());

        assert_eq!(config.crawler.max_depth, 4);
        assert_eq!(config.crawler.seeds, vec!["https://example.com/"]);
        assert_eq!(config.crawler.plugins, vec!["word_count"]);
    }

    #[test]
    fn test_fallback_on_invalid_field() {
        let file = create_temp_config("[crawler]\nmax-depth = 4\n[fetch]\nmax-workers = 0\n");
        let config = load_config_or_default(file.path());
        assert_eq!(config.crawler.max_depth, 2);
        assert_eq!(config.fetch.max_workers, 5);
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
