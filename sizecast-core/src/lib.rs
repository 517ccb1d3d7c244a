//! SizeCast Core — outcome history, signals, fusion, risk state machine.
//!
//! This crate contains the prediction engine:
//! - Domain types (period ids, outcomes, categories, decisions)
//! - Bounded outcome history with incrementally maintained transition tables
//! - Pattern, Markov, momentum and classifier signals behind one trait
//! - Entropy and anomaly gates
//! - Weighted ensemble fusion with optional weight adaptation
//! - Level × Mode risk state machine and the session scoreboard
//! - The engine loop, immutable snapshots and a worker-thread service

pub mod components;
pub mod config;
pub mod domain;
pub mod engine;
pub mod history;
pub mod journal;
pub mod risk;
pub mod session;

pub use config::{ComponentConfig, ConfigError, EngineConfig, Preset};
pub use domain::{Category, Decision, GradedResult, IngestError, Outcome, PeriodId, Prediction, RawObservation};
pub use engine::{Engine, EngineSnapshot, IgnoreReason, IngestStatus, SeedSummary, SnapshotReader};
pub use history::OutcomeHistory;
pub use journal::LogEntry;
pub use risk::{Mode, RiskState, RiskStateMachine, TriggerLossPolicy};
pub use session::{SessionStats, SessionTracker};
