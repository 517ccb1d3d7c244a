//! Immutable engine snapshots and the cell that publishes them.
//!
//! The producer builds a fresh `EngineSnapshot` after every accepted update
//! and swaps the `Arc` under a write lock. Readers clone the `Arc` and never
//! observe a half-applied update.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};

use crate::components::fusion::SourceWeight;
use crate::domain::{Decision, Outcome, PeriodId};
use crate::journal::LogEntry;
use crate::risk::RiskState;
use crate::session::SessionStats;

/// Categories shown in `recent_categories`.
pub(crate) const CATEGORY_TAIL: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    /// Bumped on every publish.
    pub version: u64,
    pub next_period: Option<PeriodId>,
    pub pending: Option<Decision>,
    pub risk: RiskState,
    pub stats: SessionStats,
    pub sessions_completed: u32,
    pub recovery_entries: u32,
    /// Newest first.
    pub recent_log: Vec<LogEntry>,
    pub weights: Vec<SourceWeight>,
    pub history_len: usize,
    pub last_outcome: Option<Outcome>,
    /// `B`/`S` string of the most recent categories, oldest first.
    pub recent_categories: String,
}

impl EngineSnapshot {
    pub fn empty(risk: RiskState, weights: Vec<SourceWeight>) -> Self {
        Self {
            version: 0,
            next_period: None,
            pending: None,
            risk,
            stats: SessionStats::default(),
            sessions_completed: 0,
            recovery_entries: 0,
            recent_log: Vec::new(),
            weights,
            history_len: 0,
            last_outcome: None,
            recent_categories: String::new(),
        }
    }
}

/// Single-writer publication point.
#[derive(Debug)]
pub struct SnapshotCell {
    inner: Arc<RwLock<Arc<EngineSnapshot>>>,
}

impl SnapshotCell {
    pub fn new(initial: EngineSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(initial))),
        }
    }

    pub fn publish(&self, snapshot: EngineSnapshot) {
        let next = Arc::new(snapshot);
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = next;
    }

    pub fn load(&self) -> Arc<EngineSnapshot> {
        Arc::clone(&self.inner.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Cloneable read handle for presentation collaborators.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    inner: Arc<RwLock<Arc<EngineSnapshot>>>,
}

impl SnapshotReader {
    pub fn load(&self) -> Arc<EngineSnapshot> {
        Arc::clone(&self.inner.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn version(&self) -> u64 {
        self.load().version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_sees_published_snapshot() {
        let cell = SnapshotCell::new(EngineSnapshot::empty(RiskState::default(), Vec::new()));
        let reader = cell.reader();
        let before = reader.load();
        assert_eq!(before.version, 0);

        let mut next = (*before).clone();
        next.version = 1;
        next.history_len = 7;
        cell.publish(next);

        assert_eq!(reader.version(), 1);
        assert_eq!(reader.load().history_len, 7);
        // Old handles keep their snapshot.
        assert_eq!(before.history_len, 0);
    }

    #[test]
    fn readers_on_other_threads() {
        let cell = SnapshotCell::new(EngineSnapshot::empty(RiskState::default(), Vec::new()));
        let reader = cell.reader();
        let mut next = (*cell.load()).clone();
        next.version = 3;
        cell.publish(next);
        let seen = std::thread::spawn(move || reader.version()).join().unwrap();
        assert_eq!(seen, 3);
    }
}
