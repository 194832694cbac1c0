//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the round loop that coordinates:
//! - Seeding and resuming the frontier
//! - Concurrent fetching of every pending address
//! - Analysis, plugins, scoring and language gating of each page
//! - Depth-bounded link expansion
//! - Flushing results and frontier on completion or interruption

use crate::config::{Config, CrawlerConfig};
use crate::crawler::fetcher::{FetchResult, Fetcher};
use crate::crawler::parser::{resolve_link, ContentAnalyzer, HtmlAnalyzer, UNKNOWN_LANGUAGE};
use crate::crawler::plugins::PluginSet;
use crate::crawler::scoring::{scoring_policy, ScoringPolicy};
use crate::output::{CrawlStatistics, ExportRecord, ResultSink};
use crate::state::{AddressState, StateLedger};
use crate::storage::{open_frontier, Frontier, WorkItem};
use crate::{MinimaError, Result};
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use url::Url;

/// How a crawl run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The frontier ran dry
    Completed,

    /// Cancellation was requested; buffered results were flushed
    Interrupted,
}

/// Whether the round loop keeps going after one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Interrupted,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    crawler: CrawlerConfig,
    languages: Vec<String>,
    frontier: Frontier,
    fetcher: Fetcher,
    sink: ResultSink,
    analyzer: Box<dyn ContentAnalyzer>,
    plugins: PluginSet,
    scoring: Box<dyn ScoringPolicy>,
    ledger: StateLedger,
    rejected_links: HashSet<String>,
    stats: CrawlStatistics,
}

impl Coordinator {
    /// Creates a coordinator from a full configuration
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `fresh` - Whether to clear the persisted frontier first
    pub fn new(config: Config, fresh: bool) -> Result<Self> {
        let mut frontier = open_frontier(&config.frontier);
        if fresh {
            tracing::info!("Fresh start requested, clearing frontier");
            frontier.clear();
        }

        let fetcher = Fetcher::new(&config.fetch)?;
        let sink = ResultSink::new(&config.output);
        let plugins = PluginSet::from_names(&config.crawler.plugins)?;
        let scoring = scoring_policy(config.crawler.scoring);

        Ok(Self::from_parts(config.crawler, frontier, fetcher, sink)
            .with_plugins(plugins)
            .with_scoring(scoring))
    }

    /// Assembles a coordinator from already-built components
    ///
    /// Uses [`HtmlAnalyzer`], no plugins and the origin scoring policy until
    /// replaced with the `with_*` methods.
    pub fn from_parts(
        crawler: CrawlerConfig,
        frontier: Frontier,
        fetcher: Fetcher,
        sink: ResultSink,
    ) -> Self {
        let languages = crawler.normalized_languages();
        Self {
            scoring: scoring_policy(crawler.scoring),
            crawler,
            languages,
            frontier,
            fetcher,
            sink,
            analyzer: Box::new(HtmlAnalyzer::new()),
            plugins: PluginSet::new(),
            ledger: StateLedger::new(),
            rejected_links: HashSet::new(),
            stats: CrawlStatistics::default(),
        }
    }

    pub fn with_analyzer(mut self, analyzer: Box<dyn ContentAnalyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn with_plugins(mut self, plugins: PluginSet) -> Self {
        self.plugins = plugins;
        self
    }

    pub fn with_scoring(mut self, scoring: Box<dyn ScoringPolicy>) -> Self {
        self.scoring = scoring;
        self
    }

    /// Enqueues the configured seeds unless there is pending work to resume
    ///
    /// Returns the number of seeds added.
    pub fn seed(&mut self) -> usize {
        if !self.frontier.is_empty() {
            tracing::info!(
                "Resuming with {} pending addresses, seeds ignored",
                self.frontier.pending_len()
            );
            return 0;
        }

        if self.crawler.seeds.is_empty() {
            tracing::warn!("No seed addresses configured");
            return 0;
        }

        let mut added = 0;
        for seed in &self.crawler.seeds {
            if self.frontier.add(WorkItem::seed(seed.as_str())) {
                added += 1;
            } else {
                tracing::debug!("Seed {} already known, skipped", seed);
            }
        }

        tracing::info!("Added {} of {} seeds", added, self.crawler.seeds.len());
        added
    }

    /// Runs rounds until the frontier is empty or `cancel` fires
    ///
    /// # Round Flow
    ///
    /// 1. Snapshot all pending work, highest score first
    /// 2. Fetch it concurrently
    /// 3. Process each result serially in snapshot order
    /// 4. Enqueue accepted links for the next round
    ///
    /// Buffered results and frontier state are flushed before returning,
    /// whatever the outcome.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<RunStatus> {
        tracing::info!(
            "Starting {:?} crawl (max depth {}, {} pending)",
            self.crawler.mode,
            self.crawler.max_depth,
            self.frontier.pending_len()
        );
        let start = Instant::now();

        let requeued = self.ledger.requeue_unfinished();
        if requeued > 0 {
            tracing::info!("Requeued {} addresses left unfinished by the last run", requeued);
        }

        let outcome = self.run_rounds(&cancel).await;
        self.finish();
        self.stats.elapsed = start.elapsed();

        match &outcome {
            Ok(RunStatus::Completed) => tracing::info!(
                "Crawl completed: {} rounds, {} exported in {:?}",
                self.stats.rounds,
                self.stats.exported,
                self.stats.elapsed
            ),
            Ok(RunStatus::Interrupted) => tracing::warn!(
                "Crawl interrupted, {} addresses left pending",
                self.frontier.pending_len()
            ),
            Err(e) => tracing::error!("Crawl aborted: {}", e),
        }

        outcome
    }

    async fn run_rounds(&mut self, cancel: &CancellationToken) -> Result<RunStatus> {
        loop {
            if cancel.is_cancelled() {
                return Ok(RunStatus::Interrupted);
            }

            let batch = self.frontier.remaining_work();
            if batch.is_empty() {
                tracing::info!("Frontier is empty, crawl complete");
                return Ok(RunStatus::Completed);
            }

            self.stats.rounds += 1;
            tracing::info!("Round {}: {} addresses", self.stats.rounds, batch.len());

            for item in &batch {
                self.ledger.observe_pending(&item.address);
            }
            let addresses: Vec<String> = batch.iter().map(|item| item.address.clone()).collect();

            let mut results = tokio::select! {
                _ = cancel.cancelled() => return Ok(RunStatus::Interrupted),
                results = self.fetcher.fetch_all(&addresses) => results,
            };

            for item in batch {
                if cancel.is_cancelled() {
                    return Ok(RunStatus::Interrupted);
                }

                let result = results.remove(&item.address).ok_or_else(|| {
                    MinimaError::Invariant(format!("no fetch result for {}", item.address))
                })?;

                if self.process(&item, result, cancel).await? == Flow::Interrupted {
                    return Ok(RunStatus::Interrupted);
                }

                if self.pause(cancel).await == Flow::Interrupted {
                    return Ok(RunStatus::Interrupted);
                }
            }
        }
    }

    /// Handles one fetched address through to `Processed`
    async fn process(
        &mut self,
        item: &WorkItem,
        result: FetchResult,
        cancel: &CancellationToken,
    ) -> Result<Flow> {
        let address = item.address.as_str();

        let body = match result.body {
            Some(body) if result.succeeded => body,
            _ => {
                tracing::warn!(
                    "Fetch failed for {} (status {:?}, {} attempts)",
                    address,
                    result.status,
                    result.attempts
                );
                self.stats.failed += 1;
                self.ledger.advance(address, AddressState::FetchFailed)?;
                self.complete(address)?;
                return Ok(Flow::Continue);
            }
        };

        self.stats.fetched += 1;
        self.ledger.advance(address, AddressState::Fetched)?;

        if let Some(language) = self.rejected_language(&body) {
            tracing::info!("Skipping {}: language '{}' not accepted", address, language);
            self.stats.rejected += 1;
            self.ledger.advance(address, AddressState::RejectedByLanguage)?;
            self.complete(address)?;
            return Ok(Flow::Continue);
        }

        let mut record = self.analyze(&body, address);
        self.plugins.apply(address, &body, &mut record);
        let score = self.scoring.score_page(&record, item.score);
        record.insert("score", score);

        // links are enqueued before export so an interrupted expansion leaves
        // the page pending and unexported
        if self.crawler.mode.follows_links() && item.depth < self.crawler.max_depth {
            let hrefs = record.text_list("links");
            if self.expand(address, &hrefs, item.depth + 1, cancel).await == Flow::Interrupted {
                return Ok(Flow::Interrupted);
            }
        }

        self.ledger.advance(address, AddressState::Accepted)?;
        self.sink.add_record(record);
        self.stats.exported += 1;
        self.complete(address)?;

        Ok(Flow::Continue)
    }

    fn complete(&mut self, address: &str) -> Result<()> {
        self.frontier.mark_processed(address);
        self.ledger.advance(address, AddressState::Processed)
    }

    /// Runs the analyzer, isolating panics
    fn analyze(&self, body: &str, address: &str) -> ExportRecord {
        match panic::catch_unwind(AssertUnwindSafe(|| self.analyzer.analyze(body, address))) {
            Ok(record) => record,
            Err(_) => {
                tracing::error!("Analyzer panicked on {}", address);
                let mut record = ExportRecord::new();
                record.insert("url", address);
                record.insert("error", "analysis failed");
                record
            }
        }
    }

    /// Language of `body` when a language policy rejects it
    fn rejected_language(&self, body: &str) -> Option<String> {
        if self.languages.is_empty() {
            return None;
        }

        let language =
            panic::catch_unwind(AssertUnwindSafe(|| self.analyzer.detect_language(body)))
                .unwrap_or_else(|_| UNKNOWN_LANGUAGE.to_string())
                .trim()
                .to_lowercase();

        if self.languages.contains(&language) {
            None
        } else {
            Some(language)
        }
    }

    /// Resolves, gates and enqueues links discovered on `origin` at `depth`
    async fn expand(
        &mut self,
        origin: &str,
        hrefs: &[String],
        depth: u32,
        cancel: &CancellationToken,
    ) -> Flow {
        let Ok(base) = Url::parse(origin) else {
            tracing::warn!("Cannot resolve links against {}", origin);
            return Flow::Continue;
        };

        let mut seen = HashSet::new();
        let candidates: Vec<String> = hrefs
            .iter()
            .filter_map(|href| resolve_link(href, &base))
            .filter(|link| !self.frontier.contains(link) && !self.rejected_links.contains(link))
            .filter(|link| seen.insert(link.clone()))
            .collect();

        if candidates.is_empty() {
            return Flow::Continue;
        }

        let accepted = if self.languages.is_empty() {
            candidates
        } else {
            let previews = tokio::select! {
                _ = cancel.cancelled() => return Flow::Interrupted,
                previews = self.fetcher.fetch_previews(&candidates, self.fetcher.preview_bytes()) => previews,
            };

            let mut accepted = Vec::with_capacity(candidates.len());
            for link in candidates {
                let preview = previews.get(&link).map(String::as_str).unwrap_or("");
                match self.rejected_language(preview) {
                    None => accepted.push(link),
                    Some(language) => {
                        tracing::debug!("Link {} rejected: language '{}'", link, language);
                        self.stats.rejected += 1;
                        self.rejected_links.insert(link);
                    }
                }
            }
            accepted
        };

        let mut added = 0;
        for link in accepted {
            let score = self.scoring.score_link(&link, depth);
            if self.frontier.add(WorkItem::new(link.as_str(), depth, score)) {
                self.ledger.observe_pending(&link);
                added += 1;
            }
        }

        self.stats.enqueued += added;
        tracing::debug!("Enqueued {} links from {} at depth {}", added, origin, depth);
        Flow::Continue
    }

    /// Politeness delay between pages
    async fn pause(&self, cancel: &CancellationToken) -> Flow {
        let delay = self.crawler.delay();
        if delay == Duration::ZERO {
            return Flow::Continue;
        }

        tokio::select! {
            _ = cancel.cancelled() => Flow::Interrupted,
            _ = tokio::time::sleep(delay) => Flow::Continue,
        }
    }

    /// Forces buffered results and frontier state to disk
    fn finish(&mut self) {
        let report = self.sink.flush();
        if !report.failures.is_empty() {
            tracing::warn!("{} export format(s) failed on final flush", report.failures.len());
        }

        if let Err(e) = self.frontier.flush() {
            tracing::warn!("Failed to persist frontier: {}", e);
        }
    }

    pub fn statistics(&self) -> &CrawlStatistics {
        &self.stats
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn frontier_mut(&mut self) -> &mut Frontier {
        &mut self.frontier
    }

    pub fn sink(&self) -> &ResultSink {
        &self.sink
    }

    pub fn ledger(&self) -> &StateLedger {
        &self.ledger
    }
}

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the frontier, clearing it when `fresh` is set
/// 2. Enqueue seeds unless pending work is resumed
/// 3. Run rounds until the frontier is empty or `cancel` fires
/// 4. Flush buffered results and frontier state
///
/// # Example
///
/// ```no_run
/// use minima::config::load_config;
/// use minima::crawler::run_crawl;
/// use std::path::Path;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("minima.toml"))?;
/// let (status, stats) = run_crawl(config, false, CancellationToken::new()).await?;
/// println!("{:?}: {} exported", status, stats.exported);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    config: Config,
    fresh: bool,
    cancel: CancellationToken,
) -> Result<(RunStatus, CrawlStatistics)> {
    let mut coordinator = Coordinator::new(config, fresh)?;
    coordinator.seed();
    let status = coordinator.run(cancel).await?;
    Ok((status, coordinator.statistics().clone()))
}
