//! Per-period decision records.
//!
//! A `Decision` is produced once per period for the *next* period id and is
//! consumed exactly once: when that period's outcome arrives it is graded and
//! turned into a `LogEntry`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::components::signal::SignalVote;
use crate::risk::Mode;

use super::ids::PeriodId;
use super::outcome::Category;

/// What the engine commits to for a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Prediction {
    Call(Category),
    Skip,
}

impl Prediction {
    pub fn category(self) -> Option<Category> {
        match self {
            Self::Call(c) => Some(c),
            Self::Skip => None,
        }
    }

    pub fn is_skip(self) -> bool {
        matches!(self, Self::Skip)
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call(c) => write!(f, "{c}"),
            Self::Skip => write!(f, "SKIP"),
        }
    }
}

/// Why a period was skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// Recovery observation period: computed, never committed.
    Observation,
    /// No signal voted and the fallback rule yields nothing.
    NoSignal,
    /// Ensemble strength under the current level's floor.
    BelowThreshold { strength: f64, required: f64 },
    /// Category entropy over the recent window is near maximal.
    Chaotic { entropy: f64 },
    /// Raw digits show a repetition anomaly.
    Anomaly { detail: String },
}

/// Stake label attached to committed predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StakeTier {
    Low,
    High,
    Sureshot,
    Recovery,
}

impl fmt::Display for StakeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Low => "LOW BET",
            Self::High => "HIGH BET",
            Self::Sureshot => "SURESHOT",
            Self::Recovery => "RECOVERY",
        };
        f.write_str(label)
    }
}

/// The engine's output for one upcoming period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Period this decision is about (not yet observed).
    pub period_id: PeriodId,
    pub prediction: Prediction,
    /// Fused ensemble strength, `>= 0`.
    pub strength: f64,
    pub level: u8,
    pub mode: Mode,
    pub skip_reason: Option<SkipReason>,
    /// During observation: what would have been called.
    pub ghost: Option<Category>,
    pub tier: Option<StakeTier>,
    pub votes: Vec<SignalVote>,
}

impl Decision {
    /// True if this decision is a real, gradeable bet.
    pub fn is_committed(&self) -> bool {
        !self.prediction.is_skip() && self.mode == Mode::Normal
    }
}

/// Result of grading a decision against the observed outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GradedResult {
    Win,
    Loss,
    Skipped,
    Observed,
}

impl fmt::Display for GradedResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Win => "WIN",
            Self::Loss => "LOSS",
            Self::Skipped => "SKIPPED",
            Self::Observed => "OBSERVED",
        };
        f.write_str(label)
    }
}
