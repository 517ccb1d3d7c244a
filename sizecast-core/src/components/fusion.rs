//! Ensemble fusion — weighted combination of signal votes.
//!
//! Each active vote adds `confidence × weight` to its category's bucket and
//! `weight` to the total. The larger bucket wins; strength is the winning
//! bucket's share of the total weight, times a fixed multiplier.
//!
//! - Zero total weight falls back to a deterministic rule.
//! - Bucket ties go to the category of the highest-weighted active source
//!   (earliest in configuration order on equal weights).
//! - Weights may adapt after each resolved period through `adapt_weight`, a
//!   pure function of `(weight, vote, actual)`.

use serde::{Deserialize, Serialize};

use crate::domain::Category;

use super::signal::SignalVote;

/// What to do when no source votes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FallbackRule {
    /// Repeat the most recent observed category.
    #[default]
    RepeatLast,
    /// Produce no category.
    Skip,
}

/// Multiplicative reinforcement of source weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightAdaptation {
    pub reward: f64,
    pub penalty: f64,
    pub min_weight: f64,
    pub max_weight: f64,
}

impl Default for WeightAdaptation {
    fn default() -> Self {
        Self {
            reward: 1.01,
            penalty: 0.99,
            min_weight: 0.5,
            max_weight: 2.0,
        }
    }
}

/// New weight for a source after its vote has been graded.
///
/// Abstaining sources keep their weight.
pub fn adapt_weight(weight: f64, vote: &SignalVote, actual: Category, rule: &WeightAdaptation) -> f64 {
    match vote.prediction {
        Some(p) if p == actual => (weight * rule.reward).clamp(rule.min_weight, rule.max_weight),
        Some(_) => (weight * rule.penalty).clamp(rule.min_weight, rule.max_weight),
        None => weight,
    }
}

/// A named source and its current weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceWeight {
    pub source: String,
    pub weight: f64,
}

/// Result of fusing one period's votes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedVote {
    pub category: Option<Category>,
    pub strength: f64,
    /// Weighted confidence per category, indexed by `Category::index`.
    pub buckets: [f64; 2],
    pub total_weight: f64,
    /// True when the fallback rule produced the category.
    pub fallback: bool,
}

#[derive(Debug, Clone)]
pub struct EnsembleFusion {
    weights: Vec<SourceWeight>,
    pub fallback: FallbackRule,
    pub fallback_strength: f64,
    pub strength_multiplier: f64,
    pub adaptation: Option<WeightAdaptation>,
}

impl EnsembleFusion {
    /// `weights` must be in the same order as the votes passed to `combine`.
    pub fn new(weights: Vec<SourceWeight>) -> Self {
        Self {
            weights,
            fallback: FallbackRule::RepeatLast,
            fallback_strength: 0.5,
            strength_multiplier: 1.0,
            adaptation: None,
        }
    }

    pub fn with_fallback(mut self, rule: FallbackRule, strength: f64) -> Self {
        self.fallback = rule;
        self.fallback_strength = strength;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.strength_multiplier = multiplier;
        self
    }

    pub fn with_adaptation(mut self, adaptation: Option<WeightAdaptation>) -> Self {
        self.adaptation = adaptation;
        self
    }

    pub fn weights(&self) -> &[SourceWeight] {
        &self.weights
    }

    pub fn combine(&self, votes: &[SignalVote], last_observed: Option<Category>) -> FusedVote {
        let mut buckets = [0.0f64; 2];
        let mut total_weight = 0.0;
        // (weight, category) of the heaviest active source, first wins on equality.
        let mut heaviest: Option<(f64, Category)> = None;

        for (vote, source) in votes.iter().zip(&self.weights) {
            let Some(category) = vote.prediction else {
                continue;
            };
            buckets[category.index()] += vote.confidence * source.weight;
            total_weight += source.weight;
            if heaviest.map_or(true, |(w, _)| source.weight > w) {
                heaviest = Some((source.weight, category));
            }
        }

        if total_weight <= 0.0 {
            let category = match self.fallback {
                FallbackRule::RepeatLast => last_observed,
                FallbackRule::Skip => None,
            };
            let strength = if category.is_some() {
                self.fallback_strength
            } else {
                0.0
            };
            return FusedVote {
                category,
                strength,
                buckets,
                total_weight: 0.0,
                fallback: true,
            };
        }

        let (small, big) = (buckets[Category::Small.index()], buckets[Category::Big.index()]);
        let winner = if big > small {
            Category::Big
        } else if small > big {
            Category::Small
        } else {
            heaviest.map_or(Category::Big, |(_, c)| c)
        };

        FusedVote {
            category: Some(winner),
            strength: buckets[winner.index()] / total_weight * self.strength_multiplier,
            buckets,
            total_weight,
            fallback: false,
        }
    }

    /// Apply weight adaptation for a resolved period. No-op when disabled.
    pub fn reinforce(&mut self, votes: &[SignalVote], actual: Category) {
        let Some(rule) = self.adaptation else {
            return;
        };
        for (vote, source) in votes.iter().zip(self.weights.iter_mut()) {
            source.weight = adapt_weight(source.weight, vote, actual, &rule);
        }
    }
}
