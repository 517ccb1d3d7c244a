//! Seeded synthetic digit streams for offline replay and benchmarking.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use sizecast_core::domain::CategoryRule;
use sizecast_core::RawObservation;

/// Parameters for a synthetic stream.
///
/// With `repeat_bias = None` every digit is drawn uniformly from
/// `0..=max_value`. With `Some(p)` the next digit is drawn from the previous
/// digit's category with probability `p`, giving the stream streaks that the
/// signals can pick up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub periods: usize,
    pub seed: u64,
    pub start_period: u64,
    pub repeat_bias: Option<f64>,
    pub rule: CategoryRule,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            periods: 1000,
            seed: 42,
            start_period: 1,
            repeat_bias: None,
            rule: CategoryRule::default(),
        }
    }
}

/// Generate a deterministic stream of consecutive periods.
pub fn generate(config: &SyntheticConfig) -> Vec<RawObservation> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let rule = config.rule;
    let max = rule.max_value;
    let threshold = rule.threshold.min(max);
    let bias = config.repeat_bias.map(|p| p.clamp(0.0, 1.0));

    let mut out = Vec::with_capacity(config.periods);
    let mut prev: Option<u8> = None;
    for i in 0..config.periods {
        let raw = match (bias, prev) {
            (Some(p), Some(last)) if threshold > 0 => {
                let last_big = last >= threshold;
                let big = if rng.gen_bool(p) { last_big } else { !last_big };
                if big {
                    rng.gen_range(threshold..=max)
                } else {
                    rng.gen_range(0..threshold)
                }
            }
            _ => rng.gen_range(0..=max),
        };
        out.push(RawObservation::new(config.start_period + i as u64, raw));
        prev = Some(raw);
    }
    out
}

/// Uniform stream of `periods` digits starting at period 1.
pub fn uniform(periods: usize, seed: u64) -> Vec<RawObservation> {
    generate(&SyntheticConfig {
        periods,
        seed,
        ..SyntheticConfig::default()
    })
}
