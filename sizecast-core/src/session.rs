//! Session scoreboard.
//!
//! Counts graded, committed calls only. When `session_win_count` reaches the
//! win target every counter resets to zero on the same update; nothing else
//! in the engine is touched.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{Category, Decision};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub wins: u32,
    pub losses: u32,
    pub current_win_streak: u32,
    pub current_loss_streak: u32,
    pub max_win_streak: u32,
    pub max_loss_streak: u32,
    pub session_win_count: u32,
}

impl SessionStats {
    pub fn total(&self) -> u32 {
        self.wins + self.losses
    }

    /// Wins over graded calls; `None` before the first graded call.
    pub fn hit_rate(&self) -> Option<f64> {
        let total = self.total();
        (total > 0).then(|| f64::from(self.wins) / f64::from(total))
    }
}

/// Effect of recording a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// SKIP or observation-mode decision.
    Ignored,
    Win,
    Loss,
    /// A win that reached the target; stats are back to zero.
    SessionCompleted,
}

#[derive(Debug, Clone)]
pub struct SessionTracker {
    stats: SessionStats,
    win_target: u32,
    sessions_completed: u32,
}

impl SessionTracker {
    pub fn new(win_target: u32) -> Self {
        Self {
            stats: SessionStats::default(),
            win_target: win_target.max(1),
            sessions_completed: 0,
        }
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn win_target(&self) -> u32 {
        self.win_target
    }

    pub fn sessions_completed(&self) -> u32 {
        self.sessions_completed
    }

    pub fn record(&mut self, decision: &Decision, actual: Category) -> RecordOutcome {
        if !decision.is_committed() {
            return RecordOutcome::Ignored;
        }
        let won = decision.prediction.category() == Some(actual);
        self.record_result(won)
    }

    /// Record a graded call directly.
    pub fn record_result(&mut self, won: bool) -> RecordOutcome {
        let s = &mut self.stats;
        if !won {
            s.losses += 1;
            s.current_loss_streak += 1;
            s.current_win_streak = 0;
            s.max_loss_streak = s.max_loss_streak.max(s.current_loss_streak);
            return RecordOutcome::Loss;
        }

        s.wins += 1;
        s.current_win_streak += 1;
        s.current_loss_streak = 0;
        s.max_win_streak = s.max_win_streak.max(s.current_win_streak);
        s.session_win_count += 1;

        if s.session_win_count >= self.win_target {
            self.sessions_completed += 1;
            info!(
                sessions_completed = self.sessions_completed,
                wins = s.wins,
                losses = s.losses,
                "session target reached, resetting scoreboard"
            );
            self.stats = SessionStats::default();
            return RecordOutcome::SessionCompleted;
        }
        RecordOutcome::Win
    }
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new(20)
    }
}
