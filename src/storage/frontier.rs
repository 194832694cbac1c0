//! Persistent, score-ordered, deduplicating work frontier
//!
//! This module handles:
//! - Deduplication by address across pending and processed work
//! - Priority dequeue by authoritative score (FIFO among equal scores)
//! - Write-through or batched persistence through a [`FrontierStore`]
//! - Recovery from missing or corrupt state at startup

use crate::storage::schema::{migrate, FrontierDocument};
use crate::storage::traits::{FrontierResult, FrontierStore};
use crate::storage::WorkItem;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};

/// What loading found in the store
enum Loaded {
    Document { changed: bool },
    Missing,
    Unreadable,
}

/// Work frontier owned by a single writer
///
/// Pending items are kept in enqueue order; the `scores` map is the
/// authoritative priority. An address is never pending and processed at the
/// same time, and a processed address is never accepted again.
pub struct Frontier {
    /// Pending work in enqueue order
    pending: Vec<WorkItem>,

    /// Addresses currently in `pending`
    pending_index: HashSet<String>,

    /// Addresses that have been fully handled
    processed: BTreeSet<String>,

    /// Authoritative score per address
    scores: HashMap<String, f64>,

    store: Box<dyn FrontierStore>,

    /// Persist after this many mutations
    flush_every: usize,

    /// Mutations not yet written to the store
    unsaved_ops: usize,
}

impl Frontier {
    /// Opens a frontier from `store`
    ///
    /// Unreadable state is logged and replaced by an empty frontier; this
    /// never fails. A missing or migrated document is written back at once.
    ///
    /// # Arguments
    ///
    /// * `store` - The persistence backend
    /// * `flush_every` - Mutations per persist (1 = write-through)
    pub fn open(store: impl FrontierStore + 'static, flush_every: usize) -> Self {
        let mut frontier = Self::empty(Box::new(store), flush_every);

        match frontier.load() {
            Loaded::Document { changed: true } => {
                tracing::info!("Frontier state reconciled, rewriting");
                frontier.persist();
            }
            Loaded::Missing => {
                tracing::info!(
                    "No frontier found, creating a new one: {}",
                    frontier.store.describe()
                );
                frontier.persist();
            }
            Loaded::Document { changed: false } | Loaded::Unreadable => {}
        }

        frontier
    }

    /// Loads a frontier for reading without writing anything back
    ///
    /// Migration is applied in memory only; a missing document stays
    /// missing. Mutating the returned frontier persists as usual.
    pub fn inspect(store: impl FrontierStore + 'static) -> Self {
        let mut frontier = Self::empty(Box::new(store), 1);
        frontier.load();
        frontier
    }

    fn empty(store: Box<dyn FrontierStore>, flush_every: usize) -> Self {
        Self {
            pending: Vec::new(),
            pending_index: HashSet::new(),
            processed: BTreeSet::new(),
            scores: HashMap::new(),
            store,
            flush_every: flush_every.max(1),
            unsaved_ops: 0,
        }
    }

    fn load(&mut self) -> Loaded {
        match self.store.load() {
            Ok(Some(raw)) => {
                let migrated = migrate(raw);
                self.restore(migrated.document);
                tracing::info!(
                    "Frontier loaded from {} ({} pending, {} processed)",
                    self.store.describe(),
                    self.pending.len(),
                    self.processed.len()
                );
                Loaded::Document {
                    changed: migrated.changed,
                }
            }
            Ok(None) => Loaded::Missing,
            Err(e) => {
                tracing::warn!(
                    "Failed to load frontier from {}: {}, starting empty",
                    self.store.describe(),
                    e
                );
                Loaded::Unreadable
            }
        }
    }

    fn restore(&mut self, document: FrontierDocument) {
        self.pending_index = document
            .pending
            .iter()
            .map(|item| item.address.clone())
            .collect();
        self.pending = document.pending;
        self.processed = document.processed.into_iter().collect();
        self.scores = document.scores.into_iter().collect();
    }

    /// Adds an item unless its address is already pending or processed
    ///
    /// The depth and score of a duplicate submission are discarded. Returns
    /// true if the item was enqueued.
    pub fn add(&mut self, item: WorkItem) -> bool {
        if self.contains(&item.address) {
            tracing::trace!("Skipping known address {}", item.address);
            return false;
        }

        let mut item = item;
        if !item.score.is_finite() {
            item.score = 0.0;
        }

        tracing::debug!("Added to frontier: {} (score {})", item.address, item.score);
        self.scores.insert(item.address.clone(), item.score);
        self.pending_index.insert(item.address.clone());
        self.pending.push(item);
        self.record_mutation();
        true
    }

    /// Removes and returns the highest-scored pending item
    ///
    /// Equal scores are served in enqueue order. The returned item carries
    /// its authoritative score.
    pub fn get(&mut self) -> Option<WorkItem> {
        let index = self.best_index()?;
        let mut item = self.pending.remove(index);
        self.pending_index.remove(&item.address);
        item.score = self.score_of(&item.address, item.score);
        self.record_mutation();
        Some(item)
    }

    fn best_index(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (index, item) in self.pending.iter().enumerate() {
            let score = self.score_of(&item.address, item.score);
            // strictly greater, so equal scores keep enqueue order
            let better = match best {
                Some((_, best_score)) => score.total_cmp(&best_score) == Ordering::Greater,
                None => true,
            };
            if better {
                best = Some((index, score));
            }
        }
        best.map(|(index, _)| index)
    }

    fn score_of(&self, address: &str, fallback: f64) -> f64 {
        self.scores.get(address).copied().unwrap_or(fallback)
    }

    /// Marks an address as processed
    ///
    /// Matching is by address only, so a stale copy with a drifted score still
    /// clears the pending entry. Marking an already-processed address is a
    /// no-op.
    pub fn mark_processed(&mut self, address: &str) {
        if self.processed.contains(address) {
            return;
        }

        if self.pending_index.remove(address) {
            self.pending.retain(|item| item.address != address);
        }
        self.processed.insert(address.to_string());
        self.scores.remove(address);

        tracing::debug!("Marked as processed: {}", address);
        self.record_mutation();
    }

    /// Updates the authoritative score of a pending address
    ///
    /// Returns false if the address is not pending.
    pub fn rescore(&mut self, address: &str, score: f64) -> bool {
        if !self.pending_index.contains(address) || !score.is_finite() {
            return false;
        }

        self.scores.insert(address.to_string(), score);
        self.record_mutation();
        true
    }

    /// Snapshot of pending work sorted by descending score
    ///
    /// Ties keep enqueue order. Does not mutate the frontier.
    pub fn remaining_work(&self) -> Vec<WorkItem> {
        let mut items: Vec<WorkItem> = self
            .pending
            .iter()
            .map(|item| WorkItem {
                score: self.score_of(&item.address, item.score),
                ..item.clone()
            })
            .collect();

        // Stable sort keeps FIFO order among equal scores
        items.sort_by(|a, b| b.score.total_cmp(&a.score));
        items
    }

    /// Empties pending, processed and scores, then persists immediately
    pub fn clear(&mut self) {
        self.pending.clear();
        self.pending_index.clear();
        self.processed.clear();
        self.scores.clear();
        tracing::info!("Frontier cleared");
        self.persist();
    }

    /// True if the address is pending or processed
    pub fn contains(&self, address: &str) -> bool {
        self.pending_index.contains(address) || self.processed.contains(address)
    }

    pub fn is_pending(&self, address: &str) -> bool {
        self.pending_index.contains(address)
    }

    pub fn is_processed(&self, address: &str) -> bool {
        self.processed.contains(address)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn processed_len(&self) -> usize {
        self.processed.len()
    }

    /// Number of mutations not yet persisted
    pub fn unsaved_ops(&self) -> usize {
        self.unsaved_ops
    }

    /// Current state in its persisted layout
    pub fn snapshot(&self) -> FrontierDocument {
        FrontierDocument {
            pending: self.pending.clone(),
            processed: self.processed.iter().cloned().collect(),
            scores: self
                .scores
                .iter()
                .map(|(address, score)| (address.clone(), *score))
                .collect(),
        }
    }

    /// Writes pending mutations to the store regardless of the flush cadence
    pub fn flush(&mut self) -> FrontierResult<()> {
        if self.unsaved_ops == 0 {
            return Ok(());
        }

        let document = self.snapshot();
        self.store.save(&document)?;
        self.unsaved_ops = 0;
        Ok(())
    }

    fn record_mutation(&mut self) {
        self.unsaved_ops += 1;
        if self.unsaved_ops >= self.flush_every {
            self.persist();
        }
    }

    /// Saves the current state, logging instead of failing
    ///
    /// On failure the in-memory state stays authoritative and the save is
    /// retried on the next mutation.
    fn persist(&mut self) {
        let document = self.snapshot();
        match self.store.save(&document) {
            Ok(()) => self.unsaved_ops = 0,
            Err(e) => {
                self.unsaved_ops = self.unsaved_ops.max(1);
                tracing::error!(
                    "Failed to save frontier to {}: {}",
                    self.store.describe(),
                    e
                );
            }
        }
    }
}

impl Drop for Frontier {
    fn drop(&mut self) {
        if self.unsaved_ops > 0 {
            if let Err(e) = self.flush() {
                tracing::error!("Failed to flush frontier on shutdown: {}", e);
            }
        }
    }
}
