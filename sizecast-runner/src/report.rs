//! Report export: versioned JSON artifacts and a CSV sweep summary.
//!
//! Every persisted report carries a `schema_version`; newer versions are
//! rejected on load.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::replay::ReplayResult;
use crate::sweep::SweepResults;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode report: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("unsupported schema version {found} (max supported: {max})")]
    UnsupportedVersion { found: u32, max: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportBody {
    Replay(Box<ReplayResult>),
    Sweep(SweepResults),
}

/// A JSON report as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    /// Hash of the input observations, when they came from a file.
    pub dataset_hash: Option<String>,
    pub body: ReportBody,
}

impl Report {
    pub fn replay(result: ReplayResult, dataset_hash: Option<String>) -> Self {
        Self::new(ReportBody::Replay(Box::new(result)), dataset_hash)
    }

    pub fn sweep(results: SweepResults, dataset_hash: Option<String>) -> Self {
        Self::new(ReportBody::Sweep(results), dataset_hash)
    }

    fn new(body: ReportBody, dataset_hash: Option<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            dataset_hash,
            body,
        }
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ReportError> {
        let report: Self = serde_json::from_str(json)?;
        if report.schema_version > SCHEMA_VERSION {
            return Err(ReportError::UnsupportedVersion {
                found: report.schema_version,
                max: SCHEMA_VERSION,
            });
        }
        Ok(report)
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReportError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

/// Default file name for a report written into `dir`, stamped with local time.
pub fn default_report_path(dir: impl AsRef<Path>, prefix: &str) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    dir.as_ref().join(format!("{prefix}_{stamp}.json"))
}

/// One row per run: name, counts, hit rate and recovery entries.
pub fn sweep_csv(results: &SweepResults) -> Result<String, ReportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rank",
        "name",
        "decisions",
        "commits",
        "wins",
        "losses",
        "skips",
        "observations",
        "hit_rate",
        "max_loss_streak",
        "sessions_completed",
        "recovery_entries",
    ])?;
    for (i, r) in results.all().iter().enumerate() {
        wtr.write_record([
            (i + 1).to_string(),
            r.name.clone(),
            r.decisions.to_string(),
            r.commits.to_string(),
            r.wins.to_string(),
            r.losses.to_string(),
            r.skips.to_string(),
            r.observations.to_string(),
            r.hit_rate.map(|h| format!("{h:.4}")).unwrap_or_default(),
            r.max_loss_streak.to_string(),
            r.sessions_completed.to_string(),
            r.recovery_entries.to_string(),
        ])?;
    }
    let data = wtr.into_inner().map_err(|e| ReportError::Io(e.into_error()))?;
    Ok(String::from_utf8_lossy(&data).into_owned())
}
