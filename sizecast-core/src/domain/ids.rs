use serde::{Deserialize, Serialize};
use std::fmt;

/// Period identifier. Strictly increasing across the observed sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodId(pub u64);

impl PeriodId {
    /// The period immediately after this one.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Last four digits, as shown on the original boards.
    pub fn short(self) -> String {
        format!("{:04}", self.0 % 10_000)
    }
}

impl From<u64> for PeriodId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for PeriodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
