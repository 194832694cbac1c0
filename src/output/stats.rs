//! Crawl run statistics
//!
//! Counters collected by the coordinator during a run and printed when it
//! ends, plus the frontier summary shown by `--status`.

use crate::storage::Frontier;
use std::time::Duration;

/// Counters for one crawl run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlStatistics {
    /// Fetch/process rounds completed
    pub rounds: u64,

    /// Addresses fetched successfully
    pub fetched: u64,

    /// Addresses whose fetch failed
    pub failed: u64,

    /// Pages and links rejected by the language policy
    pub rejected: u64,

    /// Records handed to the result sink
    pub exported: u64,

    /// Links accepted into the frontier
    pub enqueued: u64,

    /// Wall time of the run
    pub elapsed: Duration,
}

impl CrawlStatistics {
    /// Addresses that reached a terminal fetch outcome
    pub fn attempted(&self) -> u64 {
        self.fetched + self.failed
    }

    /// Share of attempted addresses fetched successfully, in percent
    pub fn success_rate(&self) -> f64 {
        let attempted = self.attempted();
        if attempted == 0 {
            0.0
        } else {
            (self.fetched as f64 / attempted as f64) * 100.0
        }
    }
}

/// Prints run statistics to stdout
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Rounds: {}", stats.rounds);
    println!("  Elapsed: {:.1}s", stats.elapsed.as_secs_f64());
    println!();

    println!("Pages:");
    println!("  Fetched: {}", stats.fetched);
    println!("  Failed: {}", stats.failed);
    println!("  Rejected by language: {}", stats.rejected);
    println!("  Exported: {}", stats.exported);
    println!("  Links enqueued: {}", stats.enqueued);
    println!();

    println!(
        "Success Rate: {:.1}% ({} / {} addresses fetched)",
        stats.success_rate(),
        stats.fetched,
        stats.attempted()
    );
}

/// Prints the pending and processed counts of a frontier, highest scores first
pub fn print_frontier_status(frontier: &Frontier) {
    println!("=== Frontier Status ===\n");
    println!("  Pending: {}", frontier.pending_len());
    println!("  Processed: {}", frontier.processed_len());

    let pending = frontier.remaining_work();
    if !pending.is_empty() {
        println!();
        println!("Next up:");
        for item in pending.iter().take(10) {
            println!("  [{:.2}] depth {} {}", item.score, item.depth, item.address);
        }
        if pending.len() > 10 {
            println!("  ... and {} more", pending.len() - 10);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate() {
        let stats = CrawlStatistics {
            fetched: 3,
            failed: 1,
            ..CrawlStatistics::default()
        };

        assert_eq!(stats.attempted(), 4);
        assert_eq!(stats.success_rate(), 75.0);
    }

    #[test]
    fn test_success_rate_without_attempts() {
        assert_eq!(CrawlStatistics::default().success_rate(), 0.0);
    }
}
