//! Signal generation — each source votes on the next period's category.
//!
//! Signals see the outcome history only: never the risk state, the session
//! scoreboard or the other signals' votes. A signal that lacks data abstains
//! rather than failing.

pub mod classifier;
pub mod markov;
pub mod momentum;
pub mod pattern;

pub use classifier::ClassifierSignal;
pub use markov::MarkovSignal;
pub use momentum::MomentumSignal;
pub use pattern::PatternSignal;

use serde::{Deserialize, Serialize};

use crate::domain::{Category, Outcome};
use crate::history::OutcomeHistory;

/// One source's opinion about the next period. Produced fresh each period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalVote {
    pub source: String,
    /// `None` means the source abstains.
    pub prediction: Option<Category>,
    /// In `[0, 1]`; zero when abstaining.
    pub confidence: f64,
}

impl SignalVote {
    pub fn abstain(source: &str) -> Self {
        Self {
            source: source.to_string(),
            prediction: None,
            confidence: 0.0,
        }
    }

    pub fn call(source: &str, category: Category, confidence: f64) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            source: source.to_string(),
            prediction: Some(category),
            confidence,
        }
    }

    pub fn is_active(&self) -> bool {
        self.prediction.is_some()
    }
}

/// Trait for outcome signals.
///
/// Learned state (transition tables, model weights) is kept in step with the history through
/// `observe` and `forget`; `retrain` recomputes it from scratch. Stateless
/// signals keep the default no-op hooks.
pub trait OutcomeSignal: Send + Sync {
    /// Human-readable name (e.g., "pattern").
    fn name(&self) -> &str;

    /// Minimum history length before the signal can vote.
    fn warmup_len(&self) -> usize;

    /// Longest category context the signal reads. The history must be able
    /// to hold strictly more outcomes than this.
    fn context_len(&self) -> usize {
        0
    }

    /// Called after a new outcome has been appended to `history`.
    fn observe(&mut self, _history: &OutcomeHistory) {}

    /// Called after `evicted` has been dropped from the front of `history`.
    fn forget(&mut self, _evicted: &Outcome, _history: &OutcomeHistory) {}

    /// Rebuild learned state from the whole history.
    fn retrain(&mut self, _history: &OutcomeHistory) {}

    fn vote(&self, history: &OutcomeHistory) -> SignalVote;
}
