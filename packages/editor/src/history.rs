//! # Undo/Redo History
//!
//! Bounded stacks of full forest snapshots.
//!
//! ## Design
//!
//! - Each mutating command records the forest as it was *before* the change
//! - Undo swaps the live forest with the newest past snapshot, parking the
//!   live forest at the front of the future stack
//! - Redo takes the front of the future stack back
//! - New mutations clear the future (no branching history)
//! - Batches collapse a gesture (many mutations) into one undo step
//!
//! Snapshots are owned deep copies, so editing the live forest can never
//! reach into a stored snapshot.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut history = History::new();
//! let before = forest.clone();
//! forest.push(block);
//! history.record(before);
//!
//! history.undo(&mut forest);
//! history.redo(&mut forest);
//! ```

use crate::block::Block;
use std::collections::VecDeque;
use tracing::{debug, trace};

/// Default number of undo levels kept
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// A deep copy of the forest taken before a mutation
pub type Snapshot = Vec<Block>;

/// In-progress batch: the forest as it was when the batch began
#[derive(Debug, Clone)]
struct PendingBatch {
    before: Snapshot,
    label: Option<String>,
}

/// Undo/redo stacks for the editor forest
#[derive(Debug, Clone)]
pub struct History {
    /// Oldest first, newest last
    past: VecDeque<Snapshot>,

    /// Next redo first
    future: VecDeque<Snapshot>,

    /// Maximum number of undo levels (0 = unlimited)
    limit: usize,

    batch: Option<PendingBatch>,
}

impl History {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            past: VecDeque::new(),
            future: VecDeque::new(),
            limit,
            batch: None,
        }
    }

    /// Record the pre-mutation forest. Inside a batch this is a no-op: the
    /// batch already holds the forest from before its first mutation.
    pub fn record(&mut self, before: Snapshot) {
        if self.batch.is_some() {
            return;
        }
        self.push_past(before);
        self.future.clear();
    }

    fn push_past(&mut self, snapshot: Snapshot) {
        self.past.push_back(snapshot);

        if self.limit > 0 && self.past.len() > self.limit {
            self.past.pop_front();
            trace!(limit = self.limit, "Dropped oldest history snapshot");
        }
    }

    /// Start collapsing mutations into a single undo step.
    ///
    /// Returns false if a batch is already open.
    pub fn begin_batch(&mut self, current: &[Block], label: Option<String>) -> bool {
        if self.batch.is_some() {
            return false;
        }
        self.batch = Some(PendingBatch {
            before: current.to_vec(),
            label,
        });
        true
    }

    /// Close the batch, recording one undo step if the forest changed.
    ///
    /// Returns true when a step was recorded.
    pub fn end_batch(&mut self, current: &[Block]) -> bool {
        let Some(batch) = self.batch.take() else {
            return false;
        };
        if batch.before.as_slice() == current {
            return false;
        }
        debug!(label = ?batch.label, "Recording batched history step");
        self.push_past(batch.before);
        self.future.clear();
        true
    }

    pub fn in_batch(&self) -> bool {
        self.batch.is_some()
    }

    /// Swap `forest` with the newest past snapshot
    pub fn undo(&mut self, forest: &mut Vec<Block>) -> bool {
        let Some(previous) = self.past.pop_back() else {
            return false;
        };
        let current = std::mem::replace(forest, previous);
        self.future.push_front(current);
        true
    }

    /// Swap `forest` with the next future snapshot
    pub fn redo(&mut self, forest: &mut Vec<Block>) -> bool {
        let Some(next) = self.future.pop_front() else {
            return false;
        };
        let current = std::mem::replace(forest, next);
        self.push_past(current);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.past.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.future.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
        self.batch = None;
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
