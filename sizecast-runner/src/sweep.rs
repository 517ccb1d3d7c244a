//! Preset sweep: replay several configurations over the same data.

use std::cmp::Ordering;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use sizecast_core::{Preset, RawObservation};

use crate::config::RunConfig;
use crate::replay::{replay, ReplayError, ReplayResult};

/// Runs replays for a set of configurations, optionally in parallel.
#[derive(Debug, Clone)]
pub struct Sweep {
    runs: Vec<RunConfig>,
    parallel: bool,
}

impl Sweep {
    pub fn new(runs: Vec<RunConfig>) -> Self {
        Self {
            runs,
            parallel: true,
        }
    }

    /// Every preset, each seeded with the same number of leading periods.
    pub fn presets(seed_periods: usize) -> Self {
        Self::new(
            Preset::all()
                .iter()
                .map(|p| RunConfig::from_preset(*p).with_seed_periods(seed_periods))
                .collect(),
        )
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn run(&self, observations: &[RawObservation]) -> Result<SweepResults, ReplayError> {
        self.run_with_progress(observations, |_, _, _| {})
    }

    /// Executes the sweep, invoking `progress` after each replay with the
    /// run index, the run count and the finished result.
    pub fn run_with_progress<F>(
        &self,
        observations: &[RawObservation],
        progress: F,
    ) -> Result<SweepResults, ReplayError>
    where
        F: Fn(usize, usize, &ReplayResult) + Send + Sync,
    {
        let total = self.runs.len();
        let one = |(idx, run): (usize, &RunConfig)| -> Result<ReplayResult, ReplayError> {
            let result = replay(run, observations)?;
            progress(idx, total, &result);
            Ok(result)
        };

        let results = if self.parallel {
            self.runs
                .par_iter()
                .enumerate()
                .map(one)
                .collect::<Result<Vec<_>, ReplayError>>()?
        } else {
            self.runs
                .iter()
                .enumerate()
                .map(one)
                .collect::<Result<Vec<_>, ReplayError>>()?
        };
        Ok(SweepResults::new(results))
    }
}

/// Sweep results, ranked by hit rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepResults {
    results: Vec<ReplayResult>,
}

impl SweepResults {
    /// Sort by hit rate descending; runs without commits go last, ties go to
    /// the run with more commits, then by name.
    fn new(mut results: Vec<ReplayResult>) -> Self {
        results.sort_by(rank);
        Self { results }
    }

    pub fn all(&self) -> &[ReplayResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ReplayResult> {
        self.results.iter().find(|r| r.name == name)
    }

    pub fn best(&self) -> Option<&ReplayResult> {
        self.results.first()
    }
}

fn rank(a: &ReplayResult, b: &ReplayResult) -> Ordering {
    let by_rate = match (a.hit_rate, b.hit_rate) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_rate
        .then(b.commits.cmp(&a.commits))
        .then_with(|| a.name.cmp(&b.name))
}
