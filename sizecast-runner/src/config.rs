//! Serializable replay run configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use sizecast_core::{ConfigError, EngineConfig, Preset};

/// Unique identifier for a run (content-addressable hash).
pub type RunId = String;

/// Everything needed to reproduce a replay: the engine configuration and
/// how much of the input is bulk-seeded before grading starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Label carried into reports. Presets use their own name.
    pub name: String,
    /// Leading observations loaded through `Engine::seed`; not graded.
    pub seed_periods: usize,
    pub engine: EngineConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::from_preset(Preset::Balanced)
    }
}

impl RunConfig {
    pub fn from_preset(preset: Preset) -> Self {
        Self {
            name: preset.name().to_string(),
            seed_periods: 0,
            engine: preset.to_config(),
        }
    }

    pub fn with_seed_periods(mut self, seed_periods: usize) -> Self {
        self.seed_periods = seed_periods;
        self
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.engine.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Deterministic hash of this configuration.
    ///
    /// Two runs with identical configs over identical data produce identical
    /// results, so the id doubles as a cache key.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
