//! Factory system — converts `ComponentConfig` into runtime trait objects.
//!
//! `create_signal` and `create_gate`, plus `signal_weight` for the fusion
//! weight carried alongside each signal's parameters. Parameters are checked
//! here so the constructors' assertions never fire on user input.

use crate::config::ComponentConfig;

use super::gate::{AnomalyGate, EntropyGate, RegimeGate};
use super::signal::{
    ClassifierSignal, MarkovSignal, MomentumSignal, OutcomeSignal, PatternSignal,
};
use super::table::SequenceKey;

// ─── Error type ──────────────────────────────────────────────────────

/// Errors that can occur during component construction.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FactoryError {
    #[error("Unknown signal type: {0}")]
    UnknownSignal(String),
    #[error("Unknown gate type: {0}")]
    UnknownGate(String),
    #[error("Invalid parameter `{param}` for {component}: {reason}")]
    InvalidParam {
        component: String,
        param: String,
        reason: String,
    },
}

// ─── Helpers ─────────────────────────────────────────────────────────

/// Extract a named f64 parameter from a `ComponentConfig`, falling back to `default`.
fn param(config: &ComponentConfig, name: &str, default: f64) -> f64 {
    config.params.get(name).copied().unwrap_or(default)
}

/// Extract a named usize parameter from a `ComponentConfig`, falling back to `default`.
fn param_usize(config: &ComponentConfig, name: &str, default: usize) -> usize {
    config
        .params
        .get(name)
        .copied()
        .map(|v| v.max(0.0) as usize)
        .unwrap_or(default)
}

fn invalid(config: &ComponentConfig, param: &str, reason: impl Into<String>) -> FactoryError {
    FactoryError::InvalidParam {
        component: config.component_type.clone(),
        param: param.to_string(),
        reason: reason.into(),
    }
}

/// Fusion weight of a signal (`weight` param, default 1.0).
pub fn signal_weight(config: &ComponentConfig) -> Result<f64, FactoryError> {
    let weight = param(config, "weight", 1.0);
    if !weight.is_finite() || weight < 0.0 {
        return Err(invalid(config, "weight", "must be a finite value >= 0"));
    }
    Ok(weight)
}

// ─── Signal factory ──────────────────────────────────────────────────

/// Create an outcome signal from a `ComponentConfig`.
pub fn create_signal(config: &ComponentConfig) -> Result<Box<dyn OutcomeSignal>, FactoryError> {
    signal_weight(config)?;
    match config.component_type.as_str() {
        "pattern" => {
            let min_matches = param_usize(config, "min_matches", 3);
            let min_history = param_usize(config, "min_history", 20);
            if min_matches == 0 {
                return Err(invalid(config, "min_matches", "must be >= 1"));
            }
            let depths = pattern_depths(config)?;
            Ok(Box::new(PatternSignal::new(
                &depths,
                min_matches as u32,
                min_history,
            )))
        }
        "markov" => {
            let context_len = param_usize(config, "context_len", 3);
            let min_total = param_usize(config, "min_total", 4);
            let min_history = param_usize(config, "min_history", 10);
            if context_len == 0 || context_len > SequenceKey::MAX_LEN {
                return Err(invalid(
                    config,
                    "context_len",
                    format!("must be in 1..={}", SequenceKey::MAX_LEN),
                ));
            }
            if min_total == 0 {
                return Err(invalid(config, "min_total", "must be >= 1"));
            }
            Ok(Box::new(MarkovSignal::new(
                context_len,
                min_total as u32,
                min_history,
            )))
        }
        "momentum" => {
            let window = param_usize(config, "window", 10);
            let weighted = param(config, "weighted", 1.0) != 0.0;
            let band = param(config, "band", 0.15);
            let fixed_confidence = config.params.get("fixed_confidence").copied();
            if window == 0 {
                return Err(invalid(config, "window", "must be >= 1"));
            }
            if !(0.0..0.5).contains(&band) {
                return Err(invalid(config, "band", "must be in [0, 0.5)"));
            }
            if let Some(c) = fixed_confidence {
                if !(0.0..=1.0).contains(&c) {
                    return Err(invalid(config, "fixed_confidence", "must be in [0, 1]"));
                }
            }
            Ok(Box::new(MomentumSignal::new(
                window,
                weighted,
                band,
                fixed_confidence,
            )))
        }
        "classifier" => {
            let train_size = param_usize(config, "train_size", 500);
            let retrain_every = param_usize(config, "retrain_every", 5);
            let min_history = param_usize(config, "min_history", 20);
            let epochs = param_usize(config, "epochs", 60);
            let learning_rate = param(config, "learning_rate", 0.5);
            let l2 = param(config, "l2", 0.0);
            if train_size < 2 {
                return Err(invalid(config, "train_size", "must be >= 2"));
            }
            if retrain_every == 0 {
                return Err(invalid(config, "retrain_every", "must be >= 1"));
            }
            if epochs == 0 {
                return Err(invalid(config, "epochs", "must be >= 1"));
            }
            if !learning_rate.is_finite() || learning_rate <= 0.0 {
                return Err(invalid(config, "learning_rate", "must be a finite value > 0"));
            }
            if !l2.is_finite() || l2 < 0.0 {
                return Err(invalid(config, "l2", "must be a finite value >= 0"));
            }
            Ok(Box::new(ClassifierSignal::new(
                train_size,
                retrain_every,
                min_history,
                epochs,
                learning_rate,
                l2,
            )))
        }
        other => Err(FactoryError::UnknownSignal(other.to_string())),
    }
}

/// Pattern depths: any non-zero `depth_<n>` flags select an explicit set,
/// otherwise every depth in `min_depth..=max_depth`.
fn pattern_depths(config: &ComponentConfig) -> Result<Vec<usize>, FactoryError> {
    let mut flagged = Vec::new();
    let mut any_flags = false;
    for (key, &value) in &config.params {
        let Some(suffix) = key.strip_prefix("depth_") else {
            continue;
        };
        any_flags = true;
        let depth: usize = suffix
            .parse()
            .map_err(|_| invalid(config, key, "expected depth_<n>"))?;
        if depth == 0 || depth > SequenceKey::MAX_LEN {
            return Err(invalid(
                config,
                key,
                format!("depth must be in 1..={}", SequenceKey::MAX_LEN),
            ));
        }
        if value != 0.0 {
            flagged.push(depth);
        }
    }
    if any_flags {
        if flagged.is_empty() {
            return Err(invalid(config, "depth_<n>", "no depth is enabled"));
        }
        return Ok(flagged);
    }

    let max_depth = param_usize(config, "max_depth", 6);
    let min_depth = param_usize(config, "min_depth", 3);
    if min_depth == 0 {
        return Err(invalid(config, "min_depth", "must be >= 1"));
    }
    if max_depth < min_depth {
        return Err(invalid(config, "max_depth", "must be >= min_depth"));
    }
    if max_depth > SequenceKey::MAX_LEN {
        return Err(invalid(
            config,
            "max_depth",
            format!("must be <= {}", SequenceKey::MAX_LEN),
        ));
    }
    Ok((min_depth..=max_depth).collect())
}

// ─── Gate factory ────────────────────────────────────────────────────

/// Create a regime gate from a `ComponentConfig`.
pub fn create_gate(config: &ComponentConfig) -> Result<Box<dyn RegimeGate>, FactoryError> {
    match config.component_type.as_str() {
        "entropy" => {
            let window = param_usize(config, "window", 20);
            let ceiling = param(config, "ceiling", 0.99);
            if window < 2 {
                return Err(invalid(config, "window", "must be >= 2"));
            }
            if ceiling <= 0.0 || !ceiling.is_finite() {
                return Err(invalid(config, "ceiling", "must be > 0"));
            }
            Ok(Box::new(EntropyGate::new(window, ceiling)))
        }
        "anomaly" => {
            let window = param_usize(config, "window", 20);
            let run_length = param_usize(config, "run_length", 3);
            let max_occurrences = param_usize(config, "max_occurrences", 6);
            if window == 0 {
                return Err(invalid(config, "window", "must be >= 1"));
            }
            if run_length < 2 {
                return Err(invalid(config, "run_length", "must be >= 2"));
            }
            Ok(Box::new(AnomalyGate::new(
                window,
                run_length,
                max_occurrences,
            )))
        }
        other => Err(FactoryError::UnknownGate(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(kind: &str, params: &[(&str, f64)]) -> ComponentConfig {
        ComponentConfig {
            component_type: kind.into(),
            params: params.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    #[test]
    fn builds_all_signals() {
        for kind in ["pattern", "markov", "momentum", "classifier"] {
            let signal = create_signal(&cfg(kind, &[])).unwrap();
            assert_eq!(signal.name(), kind);
        }
    }

    #[test]
    fn builds_all_gates() {
        for kind in ["entropy", "anomaly"] {
            let gate = create_gate(&cfg(kind, &[])).unwrap();
            assert_eq!(gate.name(), kind);
        }
    }

    #[test]
    fn pattern_depth_range() {
        let signal = create_signal(&cfg("pattern", &[("max_depth", 4.0), ("min_depth", 2.0)])).unwrap();
        assert_eq!(signal.context_len(), 4);
    }

    #[test]
    fn pattern_depth_flags_pick_a_set() {
        let config = cfg(
            "pattern",
            &[("depth_3", 1.0), ("depth_5", 1.0), ("depth_7", 1.0), ("depth_6", 0.0)],
        );
        assert_eq!(pattern_depths(&config), Ok(vec![3, 5, 7]));
        let signal = create_signal(&config).unwrap();
        assert_eq!(signal.context_len(), 7);

        assert!(create_signal(&cfg("pattern", &[("depth_4", 0.0)])).is_err());
        assert!(create_signal(&cfg("pattern", &[("depth_0", 1.0)])).is_err());
        assert!(create_signal(&cfg("pattern", &[("depth_x", 1.0)])).is_err());
    }

    #[test]
    fn unknown_types_rejected() {
        assert_eq!(
            create_signal(&cfg("oracle", &[])).err(),
            Some(FactoryError::UnknownSignal("oracle".into()))
        );
        assert!(matches!(
            create_gate(&cfg("moon_phase", &[])),
            Err(FactoryError::UnknownGate(_))
        ));
    }

    #[test]
    fn invalid_params_rejected() {
        assert!(create_signal(&cfg("pattern", &[("max_depth", 2.0), ("min_depth", 3.0)])).is_err());
        assert!(create_signal(&cfg("pattern", &[("max_depth", 40.0)])).is_err());
        assert!(create_signal(&cfg("markov", &[("context_len", 0.0)])).is_err());
        assert!(create_signal(&cfg("momentum", &[("band", 0.6)])).is_err());
        assert!(create_signal(&cfg("momentum", &[("weight", -1.0)])).is_err());
        assert!(create_signal(&cfg("classifier", &[("learning_rate", f64::NAN)])).is_err());
        assert!(create_signal(&cfg("classifier", &[("retrain_every", 0.0)])).is_err());
        assert!(create_signal(&cfg("classifier", &[("train_size", 1.0)])).is_err());
        assert!(create_gate(&cfg("entropy", &[("window", 1.0)])).is_err());
        assert!(create_gate(&cfg("anomaly", &[("run_length", 1.0)])).is_err());
    }

    #[test]
    fn weight_defaults_to_one() {
        assert_eq!(signal_weight(&cfg("pattern", &[])), Ok(1.0));
        assert_eq!(signal_weight(&cfg("pattern", &[("weight", 1.5)])), Ok(1.5));
    }
}
