//! Regime gates — safety valves that can veto a decision.
//!
//! Gates are not predictive: they inspect the recent history and report
//! whether the regime is fit for a committed call. The risk state machine
//! turns a blocking verdict into a SKIP.

pub mod anomaly;
pub mod entropy;

pub use anomaly::AnomalyGate;
pub use entropy::EntropyGate;

use serde::{Deserialize, Serialize};

use crate::history::OutcomeHistory;

/// Outcome of a gate evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum GateVerdict {
    Passed,
    /// Category entropy above the ceiling. Ignored at the strictest risk level.
    Chaotic { entropy: f64 },
    /// Raw digit repetition anomaly. Always blocks.
    Anomalous { detail: String },
}

impl GateVerdict {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

/// Trait for regime gates.
pub trait RegimeGate: Send + Sync {
    /// Human-readable name (e.g., "entropy").
    fn name(&self) -> &str;

    /// Evaluate the gate over the current history. Insufficient data passes.
    fn evaluate(&self, history: &OutcomeHistory) -> GateVerdict;
}
