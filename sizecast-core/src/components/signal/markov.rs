//! Markov signal — majority next category for the last `context_len` categories.
//!
//! Transition counts are kept in step with the history (newest transition
//! added on append, oldest dropped on eviction). Exact ties abstain.

use crate::components::table::TransitionTable;
use crate::domain::Outcome;
use crate::history::OutcomeHistory;

use super::{OutcomeSignal, SignalVote};

#[derive(Debug, Clone)]
pub struct MarkovSignal {
    /// Minimum observations of the context before trusting it.
    pub min_total: u32,
    pub min_history: usize,
    table: TransitionTable,
}

impl MarkovSignal {
    pub fn new(context_len: usize, min_total: u32, min_history: usize) -> Self {
        assert!(context_len >= 1, "context_len must be >= 1");
        Self {
            min_total: min_total.max(1),
            min_history,
            table: TransitionTable::new(context_len),
        }
    }

    pub fn default_params() -> Self {
        Self::new(3, 4, 10)
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }
}

impl OutcomeSignal for MarkovSignal {
    fn name(&self) -> &str {
        "markov"
    }

    fn warmup_len(&self) -> usize {
        self.min_history.max(self.table.depth())
    }

    fn context_len(&self) -> usize {
        self.table.depth()
    }

    fn observe(&mut self, history: &OutcomeHistory) {
        self.table.observe_latest(history);
    }

    fn forget(&mut self, evicted: &Outcome, history: &OutcomeHistory) {
        self.table.forget_oldest(evicted, history);
    }

    fn retrain(&mut self, history: &OutcomeHistory) {
        self.table.rebuild(history);
    }

    fn vote(&self, history: &OutcomeHistory) -> SignalVote {
        if history.len() < self.warmup_len() {
            return SignalVote::abstain(self.name());
        }
        let Some(counts) = self
            .table
            .query_key(history)
            .and_then(|key| self.table.lookup(&key))
        else {
            return SignalVote::abstain(self.name());
        };

        let total = counts.total();
        if total < self.min_total {
            return SignalVote::abstain(self.name());
        }
        match counts.strict_majority() {
            Some((category, count)) => {
                SignalVote::call(self.name(), category, f64::from(count) / f64::from(total))
            }
            None => SignalVote::abstain(self.name()),
        }
    }
}
