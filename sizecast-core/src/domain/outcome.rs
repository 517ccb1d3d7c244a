//! Observed outcomes and their derived classifications.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::ids::PeriodId;

/// Binary class of an outcome, derived from its raw digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Small,
    Big,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Small, Category::Big];

    /// Stable bucket index (`Small = 0`, `Big = 1`).
    pub fn index(self) -> usize {
        match self {
            Self::Small => 0,
            Self::Big => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Small => Self::Big,
            Self::Big => Self::Small,
        }
    }

    /// Single-letter code used by compact category strings.
    pub fn as_char(self) -> char {
        match self {
            Self::Small => 'S',
            Self::Big => 'B',
        }
    }

    /// Numeric encoding for momentum averages (`Small = 0.0`, `Big = 1.0`).
    pub fn as_unit(self) -> f64 {
        self.index() as f64
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Small => write!(f, "SMALL"),
            Self::Big => write!(f, "BIG"),
        }
    }
}

/// Game colour of a digit. Display only; plays no part in prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Color {
    Red,
    Green,
    Violet,
}

impl Color {
    pub fn of(raw_value: u8) -> Self {
        match raw_value {
            0 | 5 => Self::Violet,
            v if v % 2 == 1 => Self::Green,
            _ => Self::Red,
        }
    }
}

/// Errors raised at the ingestion boundary. Nothing is applied when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    #[error("period id is not numeric: {0:?}")]
    NonNumericPeriod(String),
    #[error("raw value is not numeric: {0:?}")]
    NonNumericValue(String),
    #[error("raw value {value} outside domain 0..={max}")]
    OutOfDomain { value: u64, max: u8 },
}

/// Threshold function mapping a raw digit to its category.
///
/// `raw >= threshold` is `Big`, anything below is `Small`. Values above
/// `max_value` are outside the game's domain and rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryRule {
    pub threshold: u8,
    pub max_value: u8,
}

impl Default for CategoryRule {
    fn default() -> Self {
        Self {
            threshold: 5,
            max_value: 9,
        }
    }
}

impl CategoryRule {
    pub fn classify(&self, raw_value: u8) -> Result<Category, IngestError> {
        if raw_value > self.max_value {
            return Err(IngestError::OutOfDomain {
                value: u64::from(raw_value),
                max: self.max_value,
            });
        }
        if raw_value >= self.threshold {
            Ok(Category::Big)
        } else {
            Ok(Category::Small)
        }
    }
}

/// One resolved period. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub period_id: PeriodId,
    pub raw_value: u8,
    pub category: Category,
}

impl Outcome {
    pub fn new(period_id: PeriodId, raw_value: u8, rule: &CategoryRule) -> Result<Self, IngestError> {
        let category = rule.classify(raw_value)?;
        Ok(Self {
            period_id,
            raw_value,
            category,
        })
    }

    pub fn color(&self) -> Color {
        Color::of(self.raw_value)
    }
}

/// A typed `(period_id, raw_value)` pair, not yet classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawObservation {
    pub period_id: PeriodId,
    pub raw_value: u8,
}

impl RawObservation {
    pub fn new(period_id: impl Into<PeriodId>, raw_value: u8) -> Self {
        Self {
            period_id: period_id.into(),
            raw_value,
        }
    }

    /// Parse textual input as delivered by a polling collaborator.
    pub fn parse(period_id: &str, raw_value: &str) -> Result<Self, IngestError> {
        let period = period_id
            .trim()
            .parse::<u64>()
            .map_err(|_| IngestError::NonNumericPeriod(period_id.to_string()))?;
        let value = raw_value
            .trim()
            .parse::<u64>()
            .map_err(|_| IngestError::NonNumericValue(raw_value.to_string()))?;
        let raw = u8::try_from(value).map_err(|_| IngestError::OutOfDomain {
            value,
            max: u8::MAX,
        })?;
        Ok(Self::new(period, raw))
    }
}
