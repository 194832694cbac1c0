//! Relevance scoring
//!
//! The coordinator asks a [`ScoringPolicy`] for the score exported with each
//! page and for the frontier priority of each newly discovered link.

use crate::config::ScoringKind;
use crate::output::ExportRecord;

pub trait ScoringPolicy: Send + Sync {
    /// Score written to the page's export record
    fn score_page(&self, record: &ExportRecord, origin_score: f64) -> f64;

    /// Frontier priority of a link discovered at `depth`
    fn score_link(&self, address: &str, depth: u32) -> f64;
}

/// Keeps the frontier score the page was dequeued with; links score 0
#[derive(Debug, Clone, Copy, Default)]
pub struct OriginScore;

impl ScoringPolicy for OriginScore {
    fn score_page(&self, _record: &ExportRecord, origin_score: f64) -> f64 {
        origin_score
    }

    fn score_link(&self, _address: &str, _depth: u32) -> f64 {
        0.0
    }
}

/// Weighted page features: `link_count * 0.3 + image_count * 0.2 + word_count * 0.5`
///
/// Missing features count as zero. Links score 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedFeatures;

impl WeightedFeatures {
    const LINK_WEIGHT: f64 = 0.3;
    const IMAGE_WEIGHT: f64 = 0.2;
    const WORD_WEIGHT: f64 = 0.5;
}

impl ScoringPolicy for WeightedFeatures {
    fn score_page(&self, record: &ExportRecord, _origin_score: f64) -> f64 {
        let feature = |key| record.number(key).unwrap_or(0.0);

        feature("link_count") * Self::LINK_WEIGHT
            + feature("image_count") * Self::IMAGE_WEIGHT
            + feature("word_count") * Self::WORD_WEIGHT
    }

    fn score_link(&self, _address: &str, _depth: u32) -> f64 {
        0.0
    }
}

/// Builds the policy selected by `kind`
pub fn scoring_policy(kind: ScoringKind) -> Box<dyn ScoringPolicy> {
    match kind {
        ScoringKind::Origin => Box::new(OriginScore),
        ScoringKind::Weighted => Box::new(WeightedFeatures),
    }
}
