use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Minima
///
/// Every field has a built-in default so a partial file (or no file at all)
/// still yields a runnable configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub fetch: FetchConfig,
    pub frontier: FrontierConfig,
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            fetch: FetchConfig::default(),
            frontier: FrontierConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Whether the crawler only exports seed pages or also follows links
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlMode {
    /// Export the seed pages only
    Scrape,

    /// Export pages and follow their links up to `max-depth`
    #[serde(alias = "crawl_and_scrape", alias = "crawl-and-scrape")]
    Crawl,
}

impl CrawlMode {
    pub fn follows_links(&self) -> bool {
        matches!(self, Self::Crawl)
    }
}

/// Which scoring policy attaches the `score` field to exported records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringKind {
    /// The score the address carried in the frontier
    Origin,

    /// Weighted sum of link, image and word counts
    Weighted,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    pub mode: CrawlMode,

    /// Maximum depth to crawl from seed URLs
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Seed addresses enqueued at depth 0 when no resumable work exists
    pub seeds: Vec<String>,

    /// Accepted language tags; empty accepts every language
    #[serde(rename = "accept-languages")]
    pub accept_languages: Vec<String>,

    /// Plugin names, resolved against the built-in registry at load time
    pub plugins: Vec<String>,

    pub scoring: ScoringKind,

    /// Pause between processed pages (milliseconds)
    #[serde(rename = "delay-ms")]
    pub delay_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            mode: CrawlMode::Scrape,
            max_depth: 2,
            seeds: Vec::new(),
            accept_languages: Vec::new(),
            plugins: Vec::new(),
            scoring: ScoringKind::Origin,
            delay_ms: 0,
        }
    }
}

impl CrawlerConfig {
    /// Accepted languages, trimmed and lowercased
    pub fn normalized_languages(&self) -> Vec<String> {
        self.accept_languages
            .iter()
            .map(|lang| lang.trim().to_lowercase())
            .filter(|lang| !lang.is_empty())
            .collect()
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// HTTP retrieval configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Headers sent with every request
    pub headers: BTreeMap<String, String>,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Maximum number of concurrent fetches
    #[serde(rename = "max-workers")]
    pub max_workers: usize,

    /// Total attempts per address
    pub retries: u32,

    /// Base wait for rate-limit backoff, multiplied by the attempt number
    #[serde(rename = "backoff-base-ms")]
    pub backoff_base_ms: u64,

    /// Fixed wait after a transport error
    #[serde(rename = "transport-backoff-ms")]
    pub transport_backoff_ms: u64,

    /// Bytes read by a preview fetch
    #[serde(rename = "preview-bytes")]
    pub preview_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(
            "User-Agent".to_string(),
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; MinimaBot/0.9)".to_string(),
        );
        headers.insert(
            "Accept-Language".to_string(),
            "en-US,en;q=0.9".to_string(),
        );

        Self {
            headers,
            timeout_secs: 10,
            max_workers: 5,
            retries: 3,
            backoff_base_ms: 2000,
            transport_backoff_ms: 1000,
            preview_bytes: 5000,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn transport_backoff(&self) -> Duration {
        Duration::from_millis(self.transport_backoff_ms)
    }
}

/// Frontier persistence configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FrontierConfig {
    /// Path to the frontier JSON file
    pub path: PathBuf,

    /// Persist after this many mutations (1 = write-through)
    #[serde(rename = "flush-every")]
    pub flush_every: usize,
}

impl Default for FrontierConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/queue.json"),
            flush_every: 1,
        }
    }
}

/// Export configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving JSON and CSV exports
    #[serde(rename = "export-dir")]
    pub export_dir: PathBuf,

    /// Directory receiving the day-grouped SQLite stores
    #[serde(rename = "store-dir")]
    pub store_dir: PathBuf,

    /// File name prefix and SQLite table name
    pub prefix: String,

    /// Buffered records that trigger an automatic flush
    #[serde(rename = "flush-threshold")]
    pub flush_threshold: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            export_dir: PathBuf::from("exports"),
            store_dir: PathBuf::from("crawl_data"),
            prefix: "results".to_string(),
            flush_threshold: 50,
        }
    }
}
