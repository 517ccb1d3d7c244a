//! Momentum signal — short-window category bias.
//!
//! Maps categories to {Small = 0, Big = 1} and averages them over the last
//! `window` outcomes, optionally weighting recent outcomes more heavily
//! (linear weights, oldest = 1). If the mean deviates from 0.5 by more than
//! `band`, votes for the majority side.

use crate::domain::Category;
use crate::history::OutcomeHistory;

use super::{OutcomeSignal, SignalVote};

#[derive(Debug, Clone)]
pub struct MomentumSignal {
    pub window: usize,
    pub weighted: bool,
    pub band: f64,
    /// Fixed confidence for every vote; `None` uses `0.5 + |deviation|`.
    pub fixed_confidence: Option<f64>,
}

impl MomentumSignal {
    pub fn new(window: usize, weighted: bool, band: f64, fixed_confidence: Option<f64>) -> Self {
        assert!(window >= 1, "window must be >= 1");
        assert!((0.0..0.5).contains(&band), "band must be in [0, 0.5)");
        Self {
            window,
            weighted,
            band,
            fixed_confidence,
        }
    }

    pub fn default_params() -> Self {
        Self::new(10, true, 0.15, None)
    }

    /// Mean of the window in `[0, 1]`, or `None` if the window is not full.
    pub fn mean(&self, history: &OutcomeHistory) -> Option<f64> {
        if history.len() < self.window {
            return None;
        }
        let recent = history.recent_categories(self.window);
        let (sum, weight_sum) = recent
            .iter()
            .enumerate()
            .fold((0.0, 0.0), |(sum, wsum), (i, c)| {
                let w = if self.weighted { (i + 1) as f64 } else { 1.0 };
                (sum + w * c.as_unit(), wsum + w)
            });
        Some(sum / weight_sum)
    }
}

impl OutcomeSignal for MomentumSignal {
    fn name(&self) -> &str {
        "momentum"
    }

    fn warmup_len(&self) -> usize {
        self.window
    }

    fn vote(&self, history: &OutcomeHistory) -> SignalVote {
        let Some(mean) = self.mean(history) else {
            return SignalVote::abstain(self.name());
        };
        let deviation = mean - 0.5;
        if deviation.abs() <= self.band {
            return SignalVote::abstain(self.name());
        }
        let category = if deviation > 0.0 {
            Category::Big
        } else {
            Category::Small
        };
        let confidence = self
            .fixed_confidence
            .unwrap_or_else(|| (0.5 + deviation.abs()).min(1.0));
        SignalVote::call(self.name(), category, confidence)
    }
}
