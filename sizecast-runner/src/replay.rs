//! Offline replay: drive an engine over a recorded observation sequence.
//!
//! The engine's own scoreboard resets at every completed session, so the
//! replay keeps its own totals from the graded log entries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use sizecast_core::domain::StakeTier;
use sizecast_core::{
    ConfigError, Engine, EngineSnapshot, GradedResult, IngestStatus, LogEntry, RawObservation,
};

use crate::config::RunConfig;

/// Errors that abort a replay. Rejected observations do not; they are counted.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("seed rejected: {0}")]
    Seed(#[from] sizecast_core::IngestError),
}

/// Aggregate outcome of one replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayResult {
    pub name: String,
    pub config_hash: String,
    /// Observations offered to the engine, seeded ones included.
    pub periods: usize,
    pub seeded: usize,
    /// Graded decisions of any kind.
    pub decisions: usize,
    /// Decisions that were real calls (wins + losses).
    pub commits: usize,
    pub skips: usize,
    pub observations: usize,
    pub wins: usize,
    pub losses: usize,
    pub hit_rate: Option<f64>,
    pub sessions_completed: u32,
    pub recovery_entries: u32,
    pub max_win_streak: usize,
    pub max_loss_streak: usize,
    /// Committed calls by stake tier.
    pub tiers: BTreeMap<String, usize>,
    pub ignored: usize,
    pub rejected: usize,
    pub final_snapshot: EngineSnapshot,
}

#[derive(Debug, Default)]
struct Tally {
    decisions: usize,
    skips: usize,
    observations: usize,
    wins: usize,
    losses: usize,
    win_streak: usize,
    loss_streak: usize,
    max_win_streak: usize,
    max_loss_streak: usize,
    tiers: BTreeMap<String, usize>,
}

impl Tally {
    fn record(&mut self, entry: &LogEntry, tier: Option<StakeTier>) {
        self.decisions += 1;
        match entry.result {
            GradedResult::Win => {
                self.wins += 1;
                self.win_streak += 1;
                self.loss_streak = 0;
                self.max_win_streak = self.max_win_streak.max(self.win_streak);
            }
            GradedResult::Loss => {
                self.losses += 1;
                self.loss_streak += 1;
                self.win_streak = 0;
                self.max_loss_streak = self.max_loss_streak.max(self.loss_streak);
            }
            GradedResult::Skipped => self.skips += 1,
            GradedResult::Observed => self.observations += 1,
        }
        if matches!(entry.result, GradedResult::Win | GradedResult::Loss) {
            if let Some(tier) = tier {
                *self.tiers.entry(tier.to_string()).or_default() += 1;
            }
        }
    }
}

/// Replay `observations` through a fresh engine built from `run`.
///
/// The first `run.seed_periods` observations are bulk-seeded; every later one
/// goes through `ingest`, and each graded entry is tallied.
pub fn replay(run: &RunConfig, observations: &[RawObservation]) -> Result<ReplayResult, ReplayError> {
    let mut engine = Engine::new(run.engine.clone())?;
    let config_hash = run.engine.config_hash()?;

    let split = run.seed_periods.min(observations.len());
    let (seed, live) = observations.split_at(split);
    let mut ignored = 0;
    if !seed.is_empty() {
        let summary = engine.seed(seed)?;
        ignored += summary.ignored;
    }

    let mut tally = Tally::default();
    let mut rejected = 0;
    for obs in live {
        // Tier belongs to the decision being graded, which is pending now.
        let tier = engine.pending().and_then(|d| d.tier);
        match engine.ingest(obs.period_id, obs.raw_value) {
            Ok(IngestStatus::Accepted { graded, .. }) => {
                if let Some(entry) = graded {
                    tally.record(&entry, tier);
                }
            }
            Ok(IngestStatus::Ignored { reason }) => {
                debug!(period = %obs.period_id, ?reason, "ignored observation");
                ignored += 1;
            }
            Err(e) => {
                warn!(period = %obs.period_id, error = %e, "rejected observation");
                rejected += 1;
            }
        }
    }

    let commits = tally.wins + tally.losses;
    let hit_rate = (commits > 0).then(|| tally.wins as f64 / commits as f64);
    let result = ReplayResult {
        name: run.name.clone(),
        config_hash,
        periods: observations.len(),
        seeded: split,
        decisions: tally.decisions,
        commits,
        skips: tally.skips,
        observations: tally.observations,
        wins: tally.wins,
        losses: tally.losses,
        hit_rate,
        sessions_completed: engine.sessions_completed(),
        recovery_entries: engine.recovery_entries(),
        max_win_streak: tally.max_win_streak,
        max_loss_streak: tally.max_loss_streak,
        tiers: tally.tiers,
        ignored,
        rejected,
        final_snapshot: (*engine.snapshot()).clone(),
    };
    info!(
        name = %result.name,
        periods = result.periods,
        commits = result.commits,
        wins = result.wins,
        losses = result.losses,
        "replay finished"
    );
    Ok(result)
}
