//! Engine — the per-period loop over one owned `EngineState`.
//!
//! Per accepted period:
//! 1. Validate the raw value (nothing is applied on error)
//! 2. Idempotence: duplicate or older periods are ignored
//! 3. Grade the pending decision (risk transition, scoreboard, weights, log)
//! 4. Append to history, update tables incrementally
//! 5. Vote, gate, fuse and decide the next period
//! 6. Publish a fresh snapshot
//!
//! Grading before deciding means the new decision is taken at the level and
//! mode produced by the previous bet.

pub mod service;
pub mod snapshot;
pub mod state;

pub use service::{spawn_engine, EngineCommand, EngineHandle, ServiceError};
pub use snapshot::{EngineSnapshot, SnapshotCell, SnapshotReader};
pub use state::EngineState;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::components::fusion::SourceWeight;
use crate::config::{ConfigError, EngineConfig};
use crate::domain::{Decision, IngestError, Outcome, PeriodId, RawObservation};
use crate::history::OutcomeHistory;
use crate::journal::LogEntry;
use crate::risk::RiskState;
use crate::session::SessionStats;

use snapshot::CATEGORY_TAIL;

/// Why an update was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// Period already in history.
    Duplicate,
    /// Period older than the most recent one.
    Stale,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IngestStatus {
    Accepted {
        /// Grade of the decision that was pending for this period, if any.
        graded: Option<LogEntry>,
        /// Decision for the following period.
        decision: Decision,
    },
    Ignored {
        reason: IgnoreReason,
    },
}

impl IngestStatus {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    pub fn decision(&self) -> Option<&Decision> {
        match self {
            Self::Accepted { decision, .. } => Some(decision),
            Self::Ignored { .. } => None,
        }
    }
}

/// Result of a bulk seed.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedSummary {
    pub appended: usize,
    pub ignored: usize,
    /// First decision after seeding; `None` if history is still empty.
    pub decision: Option<Decision>,
}

pub struct Engine {
    state: EngineState,
    cell: SnapshotCell,
    version: u64,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        let state = EngineState::build(config)?;
        let initial = EngineSnapshot::empty(state.risk.state(), state.fusion.weights().to_vec());
        Ok(Self {
            state,
            cell: SnapshotCell::new(initial),
            version: 0,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.state.config
    }

    pub fn history(&self) -> &OutcomeHistory {
        &self.state.history
    }

    pub fn pending(&self) -> Option<&Decision> {
        self.state.pending.as_ref()
    }

    pub fn risk_state(&self) -> RiskState {
        self.state.risk.state()
    }

    pub fn stats(&self) -> SessionStats {
        self.state.session.stats()
    }

    pub fn sessions_completed(&self) -> u32 {
        self.state.session.sessions_completed()
    }

    pub fn recovery_entries(&self) -> u32 {
        self.state.recovery_entries
    }

    pub fn weights(&self) -> &[SourceWeight] {
        self.state.fusion.weights()
    }

    pub fn recent_log(&self) -> Vec<LogEntry> {
        self.state.log.to_vec()
    }

    /// Accept one resolved period.
    pub fn ingest(&mut self, period_id: PeriodId, raw_value: u8) -> Result<IngestStatus, IngestError> {
        let outcome = Outcome::new(period_id, raw_value, &self.state.config.category)?;

        if let Some(reason) = self.ignore_reason(period_id) {
            return Ok(IngestStatus::Ignored { reason });
        }

        let graded = self.state.grade(&outcome);
        self.state.append(outcome);
        let decision = self.state.decide(period_id.next());
        self.state.pending = Some(decision.clone());
        self.publish();

        Ok(IngestStatus::Accepted { graded, decision })
    }

    /// Accept one textual observation.
    pub fn ingest_str(&mut self, period_id: &str, raw_value: &str) -> Result<IngestStatus, IngestError> {
        let observation = RawObservation::parse(period_id, raw_value)?;
        self.ingest(observation.period_id, observation.raw_value)
    }

    /// Bulk-load history without grading, then issue the first decision.
    ///
    /// Every observation is validated before any is applied. A decision that
    /// was pending before the seed is dropped.
    pub fn seed(&mut self, observations: &[RawObservation]) -> Result<SeedSummary, IngestError> {
        let rule = self.state.config.category;
        let outcomes = observations
            .iter()
            .map(|o| Outcome::new(o.period_id, o.raw_value, &rule))
            .collect::<Result<Vec<_>, _>>()?;

        let mut appended = 0;
        let mut ignored = 0;
        for outcome in outcomes {
            if self.state.append(outcome).is_appended() {
                appended += 1;
            } else {
                ignored += 1;
            }
        }

        self.state.pending = None;
        let decision = self
            .state
            .history
            .last_period()
            .map(|last| self.state.decide(last.next()));
        self.state.pending = decision.clone();
        self.publish();

        info!(appended, ignored, history = self.state.history.len(), "history seeded");
        Ok(SeedSummary {
            appended,
            ignored,
            decision,
        })
    }

    /// Rebuild all transition tables from the current history.
    pub fn retrain(&mut self) {
        self.state.retrain();
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<EngineSnapshot> {
        self.cell.load()
    }

    pub fn reader(&self) -> SnapshotReader {
        self.cell.reader()
    }

    fn ignore_reason(&self, period_id: PeriodId) -> Option<IgnoreReason> {
        let last = self.state.history.last_period()?;
        if period_id == last || self.state.history.contains(period_id) {
            Some(IgnoreReason::Duplicate)
        } else if period_id < last {
            Some(IgnoreReason::Stale)
        } else {
            None
        }
    }

    fn publish(&mut self) {
        self.version += 1;
        let state = &self.state;
        let history = &state.history;
        let tail = history.recent_categories(CATEGORY_TAIL);
        let snapshot = EngineSnapshot {
            version: self.version,
            next_period: state.pending.as_ref().map(|d| d.period_id),
            pending: state.pending.clone(),
            risk: state.risk.state(),
            stats: state.session.stats(),
            sessions_completed: state.session.sessions_completed(),
            recovery_entries: state.recovery_entries,
            recent_log: state.log.to_vec(),
            weights: state.fusion.weights().to_vec(),
            history_len: history.len(),
            last_outcome: history.last().copied(),
            recent_categories: tail.iter().map(|c| c.as_char()).collect(),
        };
        self.cell.publish(snapshot);
    }
}
