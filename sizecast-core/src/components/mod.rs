//! Prediction components.
//!
//! - Signals: vote on the next category from the outcome history
//! - Gates: veto committed calls in chaotic or anomalous regimes
//! - Fusion: weighted combination of votes into one category and strength
//! - Tiers: stake labels for committed calls
//!
//! Plus the transition tables shared by the pattern and Markov signals, and
//! the factory that builds signals and gates from configuration.

pub mod factory;
pub mod fusion;
pub mod gate;
pub mod signal;
pub mod table;
pub mod tier;

pub use factory::{create_gate, create_signal, signal_weight, FactoryError};
pub use fusion::{adapt_weight, EnsembleFusion, FallbackRule, FusedVote, SourceWeight, WeightAdaptation};
pub use gate::{GateVerdict, RegimeGate};
pub use signal::{OutcomeSignal, SignalVote};
pub use table::{FollowerCounts, SequenceKey, TransitionTable};
pub use tier::TierConfig;
