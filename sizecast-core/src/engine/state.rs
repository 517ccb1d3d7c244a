//! The owned engine aggregate.
//!
//! One `EngineState` holds everything that changes as periods resolve. It is
//! mutated only by the engine's single producer; readers see it through
//! published snapshots.

use tracing::{debug, warn};

use crate::components::factory::{create_gate, create_signal, signal_weight};
use crate::components::fusion::{EnsembleFusion, SourceWeight};
use crate::components::gate::{GateVerdict, RegimeGate};
use crate::components::signal::{OutcomeSignal, SignalVote};
use crate::components::tier;
use crate::config::{ConfigError, EngineConfig};
use crate::domain::{Decision, GradedResult, Outcome, PeriodId, Prediction};
use crate::history::{AppendResult, OutcomeHistory};
use crate::journal::{LogEntry, RecentLog};
use crate::risk::{Mode, RiskStateMachine, Transition, TriggerLossPolicy};
use crate::session::SessionTracker;

pub struct EngineState {
    pub(crate) config: EngineConfig,
    pub(crate) history: OutcomeHistory,
    pub(crate) signals: Vec<Box<dyn OutcomeSignal>>,
    pub(crate) gates: Vec<Box<dyn RegimeGate>>,
    pub(crate) fusion: EnsembleFusion,
    pub(crate) risk: RiskStateMachine,
    pub(crate) session: SessionTracker,
    pub(crate) log: RecentLog,
    /// Decision for the next period, awaiting its outcome.
    pub(crate) pending: Option<Decision>,
    pub(crate) recovery_entries: u32,
}

impl EngineState {
    pub fn build(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut signals = Vec::with_capacity(config.signals.len());
        let mut weights = Vec::with_capacity(config.signals.len());
        for signal_config in &config.signals {
            let signal = create_signal(signal_config)?;
            weights.push(SourceWeight {
                source: signal.name().to_string(),
                weight: signal_weight(signal_config)?,
            });
            signals.push(signal);
        }
        let gates = config
            .gates
            .iter()
            .map(create_gate)
            .collect::<Result<Vec<_>, _>>()?;

        let fusion = EnsembleFusion::new(weights)
            .with_fallback(config.fusion.fallback, config.fusion.fallback_strength)
            .with_multiplier(config.fusion.strength_multiplier)
            .with_adaptation(config.fusion.adaptation);

        Ok(Self {
            history: OutcomeHistory::new(config.history_capacity),
            risk: RiskStateMachine::new(config.risk.thresholds.clone(), config.risk.observation_turns),
            session: SessionTracker::new(config.session.win_target),
            log: RecentLog::new(config.log_capacity),
            signals,
            gates,
            fusion,
            pending: None,
            recovery_entries: 0,
            config,
        })
    }

    /// Append to history and keep every signal's tables in step.
    pub(crate) fn append(&mut self, outcome: Outcome) -> AppendResult {
        let result = self.history.append(outcome);
        if let AppendResult::Appended { evicted } = result {
            for signal in &mut self.signals {
                signal.observe(&self.history);
            }
            if let Some(evicted) = evicted {
                for signal in &mut self.signals {
                    signal.forget(&evicted, &self.history);
                }
            }
        }
        result
    }

    /// Rebuild every signal's tables from the current history.
    pub(crate) fn retrain(&mut self) {
        for signal in &mut self.signals {
            signal.retrain(&self.history);
        }
    }

    /// Grade the pending decision against a newly observed outcome.
    ///
    /// Applies the risk transition, the scoreboard update and weight
    /// adaptation, and logs the result. A pending decision for another period
    /// is discarded.
    pub(crate) fn grade(&mut self, outcome: &Outcome) -> Option<LogEntry> {
        let decision = self.pending.take()?;
        if decision.period_id != outcome.period_id {
            warn!(
                expected = %decision.period_id,
                arrived = %outcome.period_id,
                "discarding decision for a period that never resolved"
            );
            return None;
        }

        let actual = outcome.category;
        let mut recovery_trigger = false;
        let result = if decision.mode == Mode::RecoveryObservation {
            self.risk.observation_elapsed();
            GradedResult::Observed
        } else if let Prediction::Call(called) = decision.prediction {
            let won = called == actual;
            let transition = self.risk.transition(won);
            if let Transition::EnteredObservation { .. } = transition {
                recovery_trigger = true;
                self.recovery_entries += 1;
            }
            if recovery_trigger && self.config.risk.trigger_loss == TriggerLossPolicy::Ghost {
                GradedResult::Observed
            } else {
                self.session.record(&decision, actual);
                if won {
                    GradedResult::Win
                } else {
                    GradedResult::Loss
                }
            }
        } else {
            GradedResult::Skipped
        };

        self.fusion.reinforce(&decision.votes, actual);

        let entry = LogEntry {
            period_id: outcome.period_id,
            actual,
            raw_value: outcome.raw_value,
            prediction: decision.prediction,
            result,
            recovery_trigger,
        };
        self.log.push(entry);
        Some(entry)
    }

    /// Produce the decision for `period_id` from the current history.
    pub(crate) fn decide(&mut self, period_id: PeriodId) -> Decision {
        let votes: Vec<SignalVote> = self.signals.iter().map(|s| s.vote(&self.history)).collect();
        let verdicts: Vec<GateVerdict> = self.gates.iter().map(|g| g.evaluate(&self.history)).collect();
        let last = self.history.last().map(|o| o.category);

        let fused = self.fusion.combine(&votes, last);
        let risk = self.risk.decide(&fused, &verdicts);

        let tier = risk.prediction.category().map(|category| {
            tier::classify(
                &self.config.tiers,
                category,
                fused.strength,
                self.session.stats().current_loss_streak,
                last,
                &self.history.recent_raw(2),
            )
        });

        let decision = Decision {
            period_id,
            prediction: risk.prediction,
            strength: fused.strength,
            level: risk.state.level,
            mode: risk.state.mode,
            skip_reason: risk.skip_reason,
            ghost: risk.ghost,
            tier,
            votes,
        };
        debug!(
            period = %decision.period_id,
            prediction = %decision.prediction,
            strength = decision.strength,
            level = decision.level,
            mode = %decision.mode,
            "decision"
        );
        decision
    }
}
