//! Pattern signal — what usually follows the most recent run of categories.
//!
//! Depths are checked from longest to shortest. At each depth the trailing
//! `depth` categories form the query; every earlier occurrence of the same
//! run (that has a follower inside the history) counts as a match. The first
//! depth with at least `min_matches` matches decides the vote; confidence is
//! the majority share of the followers.

use crate::components::table::TransitionTable;
use crate::domain::Outcome;
use crate::history::OutcomeHistory;

use super::{OutcomeSignal, SignalVote};

#[derive(Debug, Clone)]
pub struct PatternSignal {
    pub min_matches: u32,
    pub min_history: usize,
    /// One table per depth, longest first.
    tables: Vec<TransitionTable>,
}

impl PatternSignal {
    /// `depths` are deduplicated and ordered longest first.
    pub fn new(depths: &[usize], min_matches: u32, min_history: usize) -> Self {
        let mut depths: Vec<usize> = depths.iter().copied().filter(|d| *d >= 1).collect();
        depths.sort_unstable_by(|a, b| b.cmp(a));
        depths.dedup();
        assert!(!depths.is_empty(), "at least one depth is required");
        Self {
            min_matches: min_matches.max(1),
            min_history,
            tables: depths.into_iter().map(TransitionTable::new).collect(),
        }
    }

    pub fn default_params() -> Self {
        Self::new(&[6, 5, 4, 3], 3, 20)
    }

    pub fn depths(&self) -> Vec<usize> {
        self.tables.iter().map(TransitionTable::depth).collect()
    }

    pub fn tables(&self) -> &[TransitionTable] {
        &self.tables
    }
}

impl OutcomeSignal for PatternSignal {
    fn name(&self) -> &str {
        "pattern"
    }

    fn warmup_len(&self) -> usize {
        self.min_history
    }

    fn context_len(&self) -> usize {
        self.tables.first().map_or(0, TransitionTable::depth)
    }

    fn observe(&mut self, history: &OutcomeHistory) {
        for table in &mut self.tables {
            table.observe_latest(history);
        }
    }

    fn forget(&mut self, evicted: &Outcome, history: &OutcomeHistory) {
        for table in &mut self.tables {
            table.forget_oldest(evicted, history);
        }
    }

    fn retrain(&mut self, history: &OutcomeHistory) {
        for table in &mut self.tables {
            table.rebuild(history);
        }
    }

    fn vote(&self, history: &OutcomeHistory) -> SignalVote {
        if history.len() < self.min_history {
            return SignalVote::abstain(self.name());
        }

        for table in &self.tables {
            let Some(key) = table.query_key(history) else {
                continue;
            };
            let Some(counts) = table.lookup(&key) else {
                continue;
            };
            let total = counts.total();
            if total < self.min_matches {
                continue;
            }
            if let Some((category, count)) = counts.majority() {
                return SignalVote::call(self.name(), category, f64::from(count) / f64::from(total));
            }
        }

        SignalVote::abstain(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, CategoryRule, PeriodId};

    fn history_from(pattern: &str) -> OutcomeHistory {
        let mut h = OutcomeHistory::new(100);
        for (i, ch) in pattern.chars().enumerate() {
            let raw = if ch == 'B' { 6 } else { 3 };
            h.append(Outcome::new(PeriodId(i as u64 + 1), raw, &CategoryRule::default()).unwrap());
        }
        h
    }

    fn trained(mut signal: PatternSignal, h: &OutcomeHistory) -> PatternSignal {
        signal.retrain(h);
        signal
    }

    #[test]
    fn alternating_history_predicts_continuation() {
        let h = history_from("BSBSB");
        let signal = trained(PatternSignal::new(&[3], 1, 0), &h);
        let vote = signal.vote(&h);
        assert_eq!(vote.prediction, Some(Category::Small));
        assert_eq!(vote.confidence, 1.0);
    }

    #[test]
    fn depths_are_sorted_longest_first() {
        let signal = PatternSignal::new(&[3, 6, 4, 5, 4], 2, 0);
        assert_eq!(signal.depths(), vec![6, 5, 4, 3]);
        assert_eq!(signal.context_len(), 6);
    }

    #[test]
    fn longer_depth_wins_when_qualified() {
        // Trailing "BBSB" occurs three times earlier, so depth 2 is never consulted.
        let h = history_from("BBSBSSBBSBBSBBBSB");
        let signal = trained(PatternSignal::new(&[4, 2], 1, 0), &h);
        let deep = trained(PatternSignal::new(&[4], 1, 0), &h);
        assert_eq!(signal.vote(&h), deep.vote(&h));
    }

    #[test]
    fn falls_through_when_min_matches_not_met() {
        let h = history_from("BSBSB");
        let strict = trained(PatternSignal::new(&[4, 3], 2, 0), &h);
        assert!(!strict.vote(&h).is_active());
    }

    #[test]
    fn abstains_below_min_history() {
        let h = history_from("BSBSB");
        let signal = trained(PatternSignal::new(&[3], 1, 6), &h);
        assert!(!signal.vote(&h).is_active());
    }

    #[test]
    fn tie_breaks_on_first_seen_follower() {
        // "BS" is followed by B first, then S.
        let h = history_from("BSBSSBS");
        let signal = trained(PatternSignal::new(&[2], 2, 0), &h);
        let vote = signal.vote(&h);
        assert_eq!(vote.prediction, Some(Category::Big));
        assert_eq!(vote.confidence, 0.5);
    }
}
