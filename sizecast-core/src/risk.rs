//! Risk state machine — Level × Mode, a Mealy machine.
//!
//! Output (call or SKIP, and the floor that applied) depends on the current
//! state and the fused strength. State changes only on the grade of a
//! committed call:
//!
//! - correct → Level 1
//! - incorrect below the maximum level → Level + 1
//! - incorrect at the maximum level → RECOVERY_OBSERVATION for
//!   `observation_turns` periods, Level reset to 1
//!
//! Observation periods emit SKIP. Each graded observation period counts
//! down through `observation_elapsed`; the machine returns to NORMAL at zero.
//! Their outcomes never reach `transition`.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use crate::components::fusion::FusedVote;
use crate::components::gate::GateVerdict;
use crate::domain::{Category, Prediction, SkipReason};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    #[default]
    Normal,
    RecoveryObservation,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "NORMAL"),
            Self::RecoveryObservation => write!(f, "RECOVERY_OBSERVATION"),
        }
    }
}

/// How the loss that triggers recovery is graded on the scoreboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TriggerLossPolicy {
    /// Recorded as a real loss before the mode flips.
    #[default]
    Counted,
    /// Drives the transition but is kept off the scoreboard.
    Ghost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskState {
    pub level: u8,
    pub mode: Mode,
    pub observation_turns_remaining: u32,
}

impl Default for RiskState {
    fn default() -> Self {
        Self {
            level: 1,
            mode: Mode::Normal,
            observation_turns_remaining: 0,
        }
    }
}

/// State change produced by grading a committed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Correct call: back to Level 1.
    Reset { from: u8 },
    Escalated { to: u8 },
    EnteredObservation { turns: u32 },
    /// Called during observation; nothing changed.
    Ignored,
}

/// Output of the decision step.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskDecision {
    pub prediction: Prediction,
    pub skip_reason: Option<SkipReason>,
    /// Strength floor of the level the decision was taken at.
    pub required_strength: f64,
    /// Would-be category of an observation period.
    pub ghost: Option<Category>,
    /// State at decision time.
    pub state: RiskState,
}

#[derive(Debug, Clone)]
pub struct RiskStateMachine {
    thresholds: Vec<f64>,
    observation_turns: u32,
    state: RiskState,
}

impl RiskStateMachine {
    /// `thresholds[i]` is the strength floor of Level `i + 1`.
    pub fn new(thresholds: Vec<f64>, observation_turns: u32) -> Self {
        assert!(!thresholds.is_empty(), "at least one level is required");
        assert!(thresholds.len() <= usize::from(u8::MAX), "too many levels");
        Self {
            thresholds,
            observation_turns: observation_turns.max(1),
            state: RiskState::default(),
        }
    }

    pub fn default_params() -> Self {
        Self::new(vec![0.55, 0.70, 0.85], 3)
    }

    pub fn state(&self) -> RiskState {
        self.state
    }

    pub fn max_level(&self) -> u8 {
        self.thresholds.len() as u8
    }

    pub fn is_strictest(&self) -> bool {
        self.state.level >= self.max_level()
    }

    pub fn observation_turns(&self) -> u32 {
        self.observation_turns
    }

    /// Strength floor for `level` (clamped into the defined levels).
    pub fn required_strength(&self, level: u8) -> f64 {
        let idx = usize::from(level.max(1) - 1).min(self.thresholds.len() - 1);
        self.thresholds[idx]
    }

    pub fn decide(&mut self, fused: &FusedVote, verdicts: &[GateVerdict]) -> RiskDecision {
        let state = self.state;
        let required = self.required_strength(state.level);

        if state.mode == Mode::RecoveryObservation {
            return RiskDecision {
                prediction: Prediction::Skip,
                skip_reason: Some(SkipReason::Observation),
                required_strength: required,
                ghost: fused.category,
                state,
            };
        }

        let skip = |reason: SkipReason| RiskDecision {
            prediction: Prediction::Skip,
            skip_reason: Some(reason),
            required_strength: required,
            ghost: None,
            state,
        };

        let Some(category) = fused.category else {
            return skip(SkipReason::NoSignal);
        };

        for verdict in verdicts {
            match verdict {
                GateVerdict::Passed => {}
                GateVerdict::Anomalous { detail } => {
                    return skip(SkipReason::Anomaly {
                        detail: detail.clone(),
                    });
                }
                GateVerdict::Chaotic { entropy } => {
                    if !self.is_strictest() {
                        return skip(SkipReason::Chaotic { entropy: *entropy });
                    }
                }
            }
        }

        // NaN strength never clears a floor.
        let clears = fused.strength >= required;
        if !clears {
            return skip(SkipReason::BelowThreshold {
                strength: fused.strength,
                required,
            });
        }

        RiskDecision {
            prediction: Prediction::Call(category),
            skip_reason: None,
            required_strength: required,
            ghost: None,
            state,
        }
    }

    /// One observation period has been graded. Returns true when it was the
    /// last one and the machine is back in NORMAL.
    pub fn observation_elapsed(&mut self) -> bool {
        if self.state.mode != Mode::RecoveryObservation {
            return false;
        }
        self.state.observation_turns_remaining =
            self.state.observation_turns_remaining.saturating_sub(1);
        if self.state.observation_turns_remaining > 0 {
            return false;
        }
        self.state.mode = Mode::Normal;
        info!(level = self.state.level, "recovery observation finished");
        true
    }

    /// Grade a committed call made in NORMAL mode.
    pub fn transition(&mut self, was_correct: bool) -> Transition {
        if self.state.mode == Mode::RecoveryObservation {
            return Transition::Ignored;
        }

        if was_correct {
            let from = self.state.level;
            self.state.level = 1;
            return Transition::Reset { from };
        }

        if self.state.level < self.max_level() {
            self.state.level += 1;
            return Transition::Escalated {
                to: self.state.level,
            };
        }

        self.state = RiskState {
            level: 1,
            mode: Mode::RecoveryObservation,
            observation_turns_remaining: self.observation_turns,
        };
        info!(turns = self.observation_turns, "entering recovery observation");
        Transition::EnteredObservation {
            turns: self.observation_turns,
        }
    }
}
