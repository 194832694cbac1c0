//! On-disk shape of the frontier and migrations from older layouts
//!
//! The current layout is
//! `{"pending": [WorkItem...], "processed": [address...], "scores": {address: number}}`.
//! Older files may name the pending list `queue` and may store pending entries
//! as bare address strings or as objects keyed by `url`.

use crate::storage::WorkItem;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Current persisted frontier layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrontierDocument {
    pub pending: Vec<WorkItem>,
    pub processed: Vec<String>,
    pub scores: BTreeMap<String, f64>,
}

/// Any layout the frontier has ever been written in
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDocument {
    #[serde(default)]
    pub pending: Option<Vec<RawPending>>,

    /// Legacy name of `pending`
    #[serde(default)]
    pub queue: Option<Vec<RawPending>>,

    #[serde(default)]
    pub processed: Vec<String>,

    #[serde(default)]
    pub scores: BTreeMap<String, f64>,
}

/// A pending entry as found on disk
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawPending {
    Address(String),
    Item {
        #[serde(alias = "url")]
        address: String,
        #[serde(default)]
        depth: u32,
        #[serde(default)]
        score: Option<f64>,
    },
}

impl From<FrontierDocument> for RawDocument {
    fn from(doc: FrontierDocument) -> Self {
        Self {
            pending: Some(
                doc.pending
                    .into_iter()
                    .map(|item| RawPending::Item {
                        address: item.address,
                        depth: item.depth,
                        score: Some(item.score),
                    })
                    .collect(),
            ),
            queue: None,
            processed: doc.processed,
            scores: doc.scores,
        }
    }
}

/// Result of bringing a raw document up to the current layout
#[derive(Debug)]
pub struct Migrated {
    pub document: FrontierDocument,

    /// True when the on-disk content differs from `document`
    pub changed: bool,
}

/// Converts any known layout into a reconciled [`FrontierDocument`]
///
/// Reconciliation rules:
/// - a legacy `queue` list replaces `pending`
/// - addresses present in `processed` are dropped from pending (processed wins)
/// - duplicate pending addresses keep their first occurrence
/// - every pending address gets a score (stored score, then item score, then 0)
/// - scores for addresses that are no longer pending are discarded
pub fn migrate(raw: RawDocument) -> Migrated {
    let mut changed = false;

    let entries = match (raw.queue, raw.pending) {
        (Some(queue), _) => {
            changed = true;
            queue
        }
        (None, Some(pending)) => pending,
        (None, None) => {
            changed = true;
            Vec::new()
        }
    };

    let mut processed = Vec::with_capacity(raw.processed.len());
    let mut processed_set = HashSet::new();
    for address in raw.processed {
        if processed_set.insert(address.clone()) {
            processed.push(address);
        } else {
            changed = true;
        }
    }

    let mut pending = Vec::with_capacity(entries.len());
    let mut seen = HashSet::new();
    let mut scores = BTreeMap::new();

    for entry in entries {
        let (address, depth, item_score) = match entry {
            RawPending::Address(address) => {
                changed = true;
                (address, 0, None)
            }
            RawPending::Item {
                address,
                depth,
                score,
            } => (address, depth, score),
        };

        if processed_set.contains(&address) || !seen.insert(address.clone()) {
            changed = true;
            continue;
        }

        let score = match raw.scores.get(&address) {
            Some(stored) => *stored,
            None => {
                changed = true;
                item_score.unwrap_or(0.0)
            }
        };

        scores.insert(address.clone(), score);
        pending.push(WorkItem {
            address,
            depth,
            score,
        });
    }

    if raw.scores.len() != scores.len() {
        changed = true;
    }

    Migrated {
        document: FrontierDocument {
            pending,
            processed,
            scores,
        },
        changed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> RawDocument {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_current_layout_is_unchanged() {
        let raw = parse(
            r#"{
                "pending": [{"address": "https://a.example/", "depth": 1, "score": 2.5}],
                "processed": ["https://b.example/"],
                "scores": {"https://a.example/": 2.5}
            }"#,
        );

        let migrated = migrate(raw);
        assert!(!migrated.changed);
        assert_eq!(migrated.document.pending.len(), 1);
        assert_eq!(migrated.document.pending[0].depth, 1);
        assert_eq!(migrated.document.processed, vec!["https://b.example/"]);
    }

    #[test]
    fn test_legacy_queue_key_is_migrated() {
        let raw = parse(r#"{"queue": ["https://a.example/", "https://b.example/"]}"#);

        let migrated = migrate(raw);
        assert!(migrated.changed);
        let addresses: Vec<_> = migrated
            .document
            .pending
            .iter()
            .map(|item| item.address.as_str())
            .collect();
        assert_eq!(addresses, vec!["https://a.example/", "https://b.example/"]);
        assert_eq!(migrated.document.scores.get("https://a.example/"), Some(&0.0));
    }

    #[test]
    fn test_url_keyed_items_are_accepted() {
        let raw = parse(r#"{"pending": [{"url": "https://a.example/", "depth": 0, "score": 0}]}"#);

        let migrated = migrate(raw);
        assert_eq!(migrated.document.pending[0].address, "https://a.example/");
    }

    #[test]
    fn test_processed_wins_over_pending() {
        let raw = parse(
            r#"{
                "pending": ["https://a.example/", "https://b.example/"],
                "processed": ["https://a.example/"],
                "scores": {"https://a.example/": 1.0, "https://b.example/": 3.0}
            }"#,
        );

        let migrated = migrate(raw);
        assert!(migrated.changed);
        assert_eq!(migrated.document.pending.len(), 1);
        assert_eq!(migrated.document.pending[0].address, "https://b.example/");
        assert_eq!(migrated.document.pending[0].score, 3.0);
        assert!(!migrated.document.scores.contains_key("https://a.example/"));
    }

    #[test]
    fn test_duplicate_pending_keeps_first() {
        let raw = parse(
            r#"{"pending": [
                {"address": "https://a.example/", "depth": 0, "score": 1.0},
                {"address": "https://a.example/", "depth": 3, "score": 9.0}
            ], "scores": {"https://a.example/": 1.0}}"#,
        );

        let migrated = migrate(raw);
        assert!(migrated.changed);
        assert_eq!(migrated.document.pending.len(), 1);
        assert_eq!(migrated.document.pending[0].depth, 0);
    }
}
