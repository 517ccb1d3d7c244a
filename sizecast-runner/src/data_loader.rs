//! Period loading from CSV files.
//!
//! Input is a headed CSV with `period_id,raw_value` columns. Rows that do not
//! parse as observations are counted and skipped, never fatal. The result is
//! sorted by period with duplicate periods collapsed to their first row.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use sizecast_core::RawObservation;

/// Errors from period loading.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing column '{0}'")]
    MissingColumn(&'static str),
    #[error("no usable rows in input")]
    Empty,
}

/// Raw CSV row. Both fields stay textual so bad values are caught by the
/// ingestion boundary rather than by serde.
#[derive(Debug, Deserialize)]
struct PeriodRow {
    period_id: String,
    raw_value: String,
}

/// Observations loaded from one source.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedPeriods {
    pub observations: Vec<RawObservation>,
    /// Rows dropped because they did not parse.
    pub malformed_rows: usize,
    /// Rows dropped because their period was already present.
    pub duplicate_rows: usize,
    /// BLAKE3 over the cleaned observation sequence.
    pub dataset_hash: String,
}

impl LoadedPeriods {
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Load observations from a CSV file.
pub fn load_periods(path: impl AsRef<Path>) -> Result<LoadedPeriods, LoadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.display().to_string(),
        source,
    })?;
    let loaded = load_periods_from_reader(file)?;
    debug!(
        path = %path.display(),
        rows = loaded.len(),
        malformed = loaded.malformed_rows,
        "loaded periods"
    );
    Ok(loaded)
}

/// Load observations from any CSV reader.
pub fn load_periods_from_reader<R: Read>(reader: R) -> Result<LoadedPeriods, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    for column in ["period_id", "raw_value"] {
        if !headers.iter().any(|h| h == column) {
            return Err(LoadError::MissingColumn(column));
        }
    }

    let mut observations = Vec::new();
    let mut malformed_rows = 0;
    for (line, row) in rdr.deserialize::<PeriodRow>().enumerate() {
        let parsed = row
            .map_err(|e| e.to_string())
            .and_then(|r| RawObservation::parse(&r.period_id, &r.raw_value).map_err(|e| e.to_string()));
        match parsed {
            Ok(obs) => observations.push(obs),
            Err(reason) => {
                // +2: one for the header, one for 1-based numbering.
                warn!(line = line + 2, %reason, "skipping malformed row");
                malformed_rows += 1;
            }
        }
    }

    // Stable sort keeps the first row for each period at the front.
    observations.sort_by_key(|o| o.period_id);
    let before = observations.len();
    observations.dedup_by_key(|o| o.period_id);
    let duplicate_rows = before - observations.len();
    if duplicate_rows > 0 {
        warn!(duplicate_rows, "dropped rows with repeated period ids");
    }

    if observations.is_empty() {
        return Err(LoadError::Empty);
    }

    let dataset_hash = dataset_hash(&observations);
    Ok(LoadedPeriods {
        observations,
        malformed_rows,
        duplicate_rows,
        dataset_hash,
    })
}

/// Content hash of an observation sequence.
pub fn dataset_hash(observations: &[RawObservation]) -> String {
    let mut hasher = blake3::Hasher::new();
    for o in observations {
        hasher.update(&o.period_id.0.to_le_bytes());
        hasher.update(&[o.raw_value]);
    }
    hasher.finalize().to_hex().to_string()
}

/// Write observations as `period_id,raw_value` CSV.
pub fn write_periods_csv(observations: &[RawObservation]) -> Result<String, LoadError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["period_id", "raw_value"])?;
    for o in observations {
        wtr.write_record([o.period_id.to_string(), o.raw_value.to_string()])?;
    }
    let bytes = wtr.into_inner().map_err(|e| LoadError::Csv(e.into_error().into()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sizecast_core::PeriodId;

    fn load(text: &str) -> Result<LoadedPeriods, LoadError> {
        load_periods_from_reader(text.as_bytes())
    }

    #[test]
    fn loads_and_sorts_rows() {
        let loaded = load("period_id,raw_value\n3,7\n1,2\n2,9\n").unwrap();
        let periods: Vec<u64> = loaded.observations.iter().map(|o| o.period_id.0).collect();
        assert_eq!(periods, vec![1, 2, 3]);
        assert_eq!(loaded.observations[0].raw_value, 2);
        assert_eq!(loaded.malformed_rows, 0);
    }

    #[test]
    fn column_order_does_not_matter() {
        let loaded = load("raw_value,period_id\n4,10\n").unwrap();
        assert_eq!(loaded.observations, vec![RawObservation::new(PeriodId(10), 4)]);
    }

    #[test]
    fn malformed_rows_are_counted_and_skipped() {
        let loaded = load("period_id,raw_value\n1,3\nabc,4\n2,x\n3,300\n4,\n5,6\n").unwrap();
        assert_eq!(loaded.len(), 2);
        // 300 overflows u8; "" is non-numeric. 10..=255 passes here and is
        // rejected later by the engine's category rule.
        assert_eq!(loaded.malformed_rows, 4);
    }

    #[test]
    fn duplicate_periods_keep_first_row() {
        let loaded = load("period_id,raw_value\n5,1\n5,8\n6,2\n").unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.duplicate_rows, 1);
        assert_eq!(loaded.observations[0].raw_value, 1);
    }

    #[test]
    fn missing_column_is_an_error() {
        assert!(matches!(
            load("period,raw_value\n1,2\n"),
            Err(LoadError::MissingColumn("period_id"))
        ));
    }

    #[test]
    fn no_usable_rows_is_an_error() {
        assert!(matches!(load("period_id,raw_value\nx,y\n"), Err(LoadError::Empty)));
    }

    #[test]
    fn hash_depends_on_content() {
        let a = load("period_id,raw_value\n1,2\n2,3\n").unwrap();
        let b = load("period_id,raw_value\n2,3\n1,2\n").unwrap();
        let c = load("period_id,raw_value\n1,2\n2,4\n").unwrap();
        assert_eq!(a.dataset_hash, b.dataset_hash);
        assert_ne!(a.dataset_hash, c.dataset_hash);
        assert_eq!(a.dataset_hash.len(), 64);
    }

    #[test]
    fn written_csv_loads_back() {
        let obs = vec![RawObservation::new(1u64, 0), RawObservation::new(2u64, 9)];
        let text = write_periods_csv(&obs).unwrap();
        assert!(text.starts_with("period_id,raw_value\n"));
        assert_eq!(load(&text).unwrap().observations, obs);
    }
}
