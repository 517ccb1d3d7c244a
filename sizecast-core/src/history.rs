//! Bounded, ordered store of observed outcomes.
//!
//! Period ids are strictly increasing. Appending a period id that is already
//! present, or older than the newest one, is a no-op. When capacity is
//! exceeded the oldest outcome is evicted and handed back to the caller so
//! incremental tables can forget it.

use std::collections::VecDeque;

use crate::domain::{Category, Outcome, PeriodId};

/// Result of an append attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendResult {
    Appended { evicted: Option<Outcome> },
    /// Period id already present.
    Duplicate,
    /// Period id older than the newest one but not present.
    Stale,
}

impl AppendResult {
    pub fn is_appended(&self) -> bool {
        matches!(self, Self::Appended { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeHistory {
    outcomes: VecDeque<Outcome>,
    capacity: usize,
}

impl OutcomeHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            outcomes: VecDeque::with_capacity(capacity.min(4096) + 1),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn append(&mut self, outcome: Outcome) -> AppendResult {
        if let Some(last) = self.outcomes.back() {
            if outcome.period_id <= last.period_id {
                return if self.contains(outcome.period_id) {
                    AppendResult::Duplicate
                } else {
                    AppendResult::Stale
                };
            }
        }

        self.outcomes.push_back(outcome);
        let evicted = if self.outcomes.len() > self.capacity {
            self.outcomes.pop_front()
        } else {
            None
        };
        AppendResult::Appended { evicted }
    }

    pub fn contains(&self, period_id: PeriodId) -> bool {
        self.outcomes
            .binary_search_by_key(&period_id, |o| o.period_id)
            .is_ok()
    }

    pub fn get(&self, index: usize) -> Option<&Outcome> {
        self.outcomes.get(index)
    }

    pub fn last(&self) -> Option<&Outcome> {
        self.outcomes.back()
    }

    pub fn last_period(&self) -> Option<PeriodId> {
        self.last().map(|o| o.period_id)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Outcome> + ExactSizeIterator + '_ {
        self.outcomes.iter()
    }

    /// Last `n` outcomes in chronological order. Never padded.
    pub fn window(&self, n: usize) -> Vec<Outcome> {
        let start = self.outcomes.len().saturating_sub(n);
        self.outcomes.iter().skip(start).copied().collect()
    }

    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.outcomes.iter().map(|o| o.category)
    }

    /// Categories of the last `n` outcomes, oldest first.
    pub fn recent_categories(&self, n: usize) -> Vec<Category> {
        let start = self.outcomes.len().saturating_sub(n);
        self.outcomes.iter().skip(start).map(|o| o.category).collect()
    }

    /// Raw digits of the last `n` outcomes, oldest first.
    pub fn recent_raw(&self, n: usize) -> Vec<u8> {
        let start = self.outcomes.len().saturating_sub(n);
        self.outcomes.iter().skip(start).map(|o| o.raw_value).collect()
    }

    /// Compact `B`/`S` string of the whole buffer, oldest first.
    pub fn category_string(&self) -> String {
        self.categories().map(Category::as_char).collect()
    }
}
