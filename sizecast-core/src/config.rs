//! Engine configuration — serde/TOML surface, validation, presets.
//!
//! Every former code variant of the predictor is a `Preset` of one
//! `EngineConfig`. Signals and gates are `ComponentConfig`s resolved by the
//! factory; everything else is plain typed fields.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::components::factory::{create_gate, create_signal, signal_weight, FactoryError};
use crate::components::fusion::{FallbackRule, WeightAdaptation};
use crate::components::tier::TierConfig;
use crate::domain::CategoryRule;
use crate::risk::TriggerLossPolicy;

/// Configuration of a single component (signal or gate).
///
/// Uses `BTreeMap` for deterministic key ordering during serialization → hashing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentConfig {
    #[serde(rename = "type")]
    pub component_type: String,
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
}

impl ComponentConfig {
    pub fn new(component_type: &str, params: &[(&str, f64)]) -> Self {
        Self {
            component_type: component_type.to_string(),
            params: btree(params),
        }
    }
}

/// Helper: build a `BTreeMap<String, f64>` from `&[(&str, f64)]` pairs.
fn btree(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to write TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to encode config: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Factory(#[from] FactoryError),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("unknown preset: {0}")]
    UnknownPreset(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub fallback: FallbackRule,
    pub fallback_strength: f64,
    pub strength_multiplier: f64,
    pub adaptation: Option<WeightAdaptation>,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            fallback: FallbackRule::RepeatLast,
            fallback_strength: 0.5,
            strength_multiplier: 1.0,
            adaptation: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Strength floor per level; the count is the maximum level.
    pub thresholds: Vec<f64>,
    pub observation_turns: u32,
    pub trigger_loss: TriggerLossPolicy,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            thresholds: vec![0.55, 0.70, 0.85],
            observation_turns: 3,
            trigger_loss: TriggerLossPolicy::Counted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub win_target: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { win_target: 20 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub history_capacity: usize,
    pub log_capacity: usize,
    pub category: CategoryRule,
    pub fusion: FusionConfig,
    pub risk: RiskConfig,
    pub session: SessionConfig,
    pub tiers: TierConfig,
    /// Order matters: fusion ties fall to the earliest heaviest signal.
    pub signals: Vec<ComponentConfig>,
    pub gates: Vec<ComponentConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Preset::Balanced.to_config()
    }
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// BLAKE3 over the canonical JSON encoding; identifies a configuration
    /// in reports.
    pub fn config_hash(&self) -> Result<String, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.category.threshold == 0 || self.category.threshold > self.category.max_value {
            return invalid(format!(
                "category threshold {} must be in 1..={}",
                self.category.threshold, self.category.max_value
            ));
        }
        if self.history_capacity == 0 {
            return invalid("history_capacity must be >= 1".into());
        }
        if self.log_capacity == 0 {
            return invalid("log_capacity must be >= 1".into());
        }

        let t = &self.risk.thresholds;
        if t.is_empty() {
            return invalid("risk.thresholds must define at least one level".into());
        }
        if t.len() > usize::from(u8::MAX) {
            return invalid("risk.thresholds defines too many levels".into());
        }
        if t.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return invalid("risk.thresholds must be finite and >= 0".into());
        }
        if t.windows(2).any(|w| w[1] <= w[0]) {
            return invalid(format!("risk.thresholds must be strictly increasing: {t:?}"));
        }
        if self.risk.observation_turns == 0 {
            return invalid("risk.observation_turns must be >= 1".into());
        }
        if self.session.win_target == 0 {
            return invalid("session.win_target must be >= 1".into());
        }

        let f = &self.fusion;
        if !(0.0..=1.0).contains(&f.fallback_strength) {
            return invalid("fusion.fallback_strength must be in [0, 1]".into());
        }
        if !f.strength_multiplier.is_finite() || f.strength_multiplier <= 0.0 {
            return invalid("fusion.strength_multiplier must be > 0".into());
        }
        if let Some(a) = &f.adaptation {
            let values = [a.reward, a.penalty, a.min_weight, a.max_weight];
            if values.iter().any(|v| !v.is_finite()) {
                return invalid("fusion.adaptation values must be finite".into());
            }
            if a.min_weight < 0.0 || a.min_weight > a.max_weight {
                return invalid("fusion.adaptation weight bounds are inverted".into());
            }
            if a.reward <= 0.0 || a.penalty <= 0.0 {
                return invalid("fusion.adaptation factors must be > 0".into());
            }
        }

        if self.signals.is_empty() {
            return invalid("at least one signal is required".into());
        }
        for signal in &self.signals {
            create_signal(signal)?;
        }
        for gate in &self.gates {
            create_gate(gate)?;
        }
        Ok(())
    }

    /// Initial fusion weights, in signal order.
    pub fn signal_weights(&self) -> Result<Vec<f64>, FactoryError> {
        self.signals.iter().map(signal_weight).collect()
    }
}

// ─── Presets ────────────────────────────────────────────────────────

/// Named configurations of the predictor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// All three signals, both gates, adaptive weights.
    Balanced,
    /// Markov + deep pattern + a heavier adaptive classifier vote, anomaly
    /// gate only, low confidence floors.
    PerfectX,
    /// Pattern signal alone (depths 5..3, single match) with repeat-last
    /// fallback; tiers carry the risk.
    Apex,
    /// Stricter floors, longer observation, no adaptation.
    Conservative,
}

impl Preset {
    pub fn name(self) -> &'static str {
        match self {
            Self::Balanced => "balanced",
            Self::PerfectX => "perfect_x",
            Self::Apex => "apex",
            Self::Conservative => "conservative",
        }
    }

    /// All presets as a slice.
    pub fn all() -> &'static [Preset] {
        &[Self::Balanced, Self::PerfectX, Self::Apex, Self::Conservative]
    }

    pub fn to_config(self) -> EngineConfig {
        let base = EngineConfig {
            history_capacity: 2000,
            log_capacity: 25,
            category: CategoryRule::default(),
            fusion: FusionConfig {
                adaptation: Some(WeightAdaptation::default()),
                ..FusionConfig::default()
            },
            risk: RiskConfig::default(),
            session: SessionConfig::default(),
            tiers: TierConfig::default(),
            signals: vec![
                ComponentConfig::new(
                    "pattern",
                    &[("max_depth", 6.0), ("min_depth", 3.0), ("min_matches", 3.0), ("min_history", 20.0)],
                ),
                ComponentConfig::new("markov", &[("context_len", 3.0), ("min_total", 4.0), ("min_history", 10.0)]),
                ComponentConfig::new("momentum", &[("window", 10.0), ("weighted", 1.0), ("band", 0.15)]),
            ],
            gates: vec![
                ComponentConfig::new("entropy", &[("window", 20.0), ("ceiling", 0.99)]),
                ComponentConfig::new(
                    "anomaly",
                    &[("window", 20.0), ("run_length", 3.0), ("max_occurrences", 6.0)],
                ),
            ],
        };

        match self {
            Self::Balanced => base,
            Self::PerfectX => EngineConfig {
                fusion: FusionConfig {
                    fallback: FallbackRule::Skip,
                    adaptation: Some(WeightAdaptation {
                        reward: 1.01,
                        penalty: 0.99,
                        min_weight: 0.9,
                        max_weight: 1.8,
                    }),
                    ..FusionConfig::default()
                },
                risk: RiskConfig {
                    thresholds: vec![0.52, 0.56, 0.60],
                    ..RiskConfig::default()
                },
                signals: vec![
                    ComponentConfig::new(
                        "classifier",
                        &[("train_size", 500.0), ("retrain_every", 5.0), ("min_history", 20.0), ("weight", 1.4)],
                    ),
                    ComponentConfig::new("markov", &[("context_len", 3.0), ("min_total", 4.0), ("min_history", 10.0)]),
                    ComponentConfig::new(
                        "pattern",
                        &[("max_depth", 6.0), ("min_depth", 3.0), ("min_matches", 3.0), ("min_history", 20.0)],
                    ),
                ],
                gates: vec![ComponentConfig::new(
                    "anomaly",
                    &[("window", 20.0), ("run_length", 3.0), ("max_occurrences", 6.0)],
                )],
                ..base
            },
            Self::Apex => EngineConfig {
                fusion: FusionConfig::default(),
                risk: RiskConfig {
                    thresholds: vec![0.50, 0.65, 0.85],
                    ..RiskConfig::default()
                },
                signals: vec![ComponentConfig::new(
                    "pattern",
                    &[("max_depth", 5.0), ("min_depth", 3.0), ("min_matches", 1.0), ("min_history", 10.0)],
                )],
                gates: Vec::new(),
                ..base
            },
            Self::Conservative => EngineConfig {
                fusion: FusionConfig {
                    fallback: FallbackRule::Skip,
                    ..FusionConfig::default()
                },
                risk: RiskConfig {
                    thresholds: vec![0.60, 0.75, 0.90],
                    observation_turns: 5,
                    ..RiskConfig::default()
                },
                signals: vec![
                    ComponentConfig::new(
                        "pattern",
                        &[("max_depth", 6.0), ("min_depth", 3.0), ("min_matches", 4.0), ("min_history", 30.0)],
                    ),
                    ComponentConfig::new("markov", &[("context_len", 3.0), ("min_total", 6.0), ("min_history", 20.0)]),
                    ComponentConfig::new("momentum", &[("window", 12.0), ("weighted", 1.0), ("band", 0.2)]),
                ],
                ..base
            },
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::all()
            .iter()
            .copied()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownPreset(s.to_string()))
    }
}
