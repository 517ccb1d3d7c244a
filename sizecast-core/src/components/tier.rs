//! Stake tier classification for committed predictions.

use serde::{Deserialize, Serialize};

use crate::domain::{Category, StakeTier};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    pub recovery_loss_streak: u32,
    pub sureshot_strength: f64,
    pub high_strength: f64,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            recovery_loss_streak: 2,
            sureshot_strength: 0.85,
            high_strength: 0.65,
        }
    }
}

/// The last two raw digits sum to 9 or are equal.
pub fn is_symmetric(recent_raw: &[u8]) -> bool {
    match recent_raw {
        [.., a, b] => a == b || u16::from(*a) + u16::from(*b) == 9,
        _ => false,
    }
}

/// Label a committed call.
///
/// `recent_raw` is chronological; `last` is the most recent observed category.
pub fn classify(
    config: &TierConfig,
    prediction: Category,
    strength: f64,
    current_loss_streak: u32,
    last: Option<Category>,
    recent_raw: &[u8],
) -> StakeTier {
    if current_loss_streak >= config.recovery_loss_streak {
        StakeTier::Recovery
    } else if strength > config.sureshot_strength && is_symmetric(recent_raw) {
        StakeTier::Sureshot
    } else if strength > config.high_strength && last == Some(prediction) {
        StakeTier::High
    } else {
        StakeTier::Low
    }
}
