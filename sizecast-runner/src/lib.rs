//! SizeCast Runner — offline replay, preset sweeps and reports.
//!
//! This crate builds on `sizecast-core` to provide:
//! - CSV period loading with malformed-row accounting
//! - Seeded synthetic digit streams
//! - Replay of a configuration over a recorded sequence
//! - Parallel preset sweeps ranked by hit rate
//! - Versioned JSON reports and CSV summaries

pub mod config;
pub mod data_loader;
pub mod replay;
pub mod report;
pub mod sweep;
pub mod synthetic;

pub use config::{RunConfig, RunId};
pub use data_loader::{load_periods, load_periods_from_reader, LoadError, LoadedPeriods};
pub use replay::{replay, ReplayError, ReplayResult};
pub use report::{Report, ReportBody, ReportError, SCHEMA_VERSION};
pub use sweep::{Sweep, SweepResults};
pub use synthetic::SyntheticConfig;
