//! Domain types: period ids, outcomes, categories, decisions.

pub mod decision;
pub mod ids;
pub mod outcome;

pub use decision::{Decision, GradedResult, Prediction, SkipReason, StakeTier};
pub use ids::PeriodId;
pub use outcome::{Category, CategoryRule, Color, IngestError, Outcome, RawObservation};
