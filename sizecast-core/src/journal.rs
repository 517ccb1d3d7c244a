//! Recent prediction log — bounded, newest first.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::domain::{Category, GradedResult, PeriodId, Prediction};

/// One graded period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub period_id: PeriodId,
    pub actual: Category,
    pub raw_value: u8,
    pub prediction: Prediction,
    pub result: GradedResult,
    /// This loss moved the risk machine into recovery observation.
    pub recovery_trigger: bool,
}

#[derive(Debug, Clone)]
pub struct RecentLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl RecentLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.front()
    }

    /// Newest first.
    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.entries.iter().copied().collect()
    }
}
