//! Anomaly gate — vetoes calls when the raw digits look manipulated.
//!
//! Over the last `window` raw digits, blocks when any digit repeats
//! `run_length` times in a row, or when any digit occurs more than
//! `max_occurrences` times.

use crate::history::OutcomeHistory;

use super::{GateVerdict, RegimeGate};

#[derive(Debug, Clone)]
pub struct AnomalyGate {
    pub window: usize,
    pub run_length: usize,
    pub max_occurrences: usize,
}

impl AnomalyGate {
    pub fn new(window: usize, run_length: usize, max_occurrences: usize) -> Self {
        assert!(window >= 1, "window must be >= 1");
        assert!(run_length >= 2, "run_length must be >= 2");
        Self {
            window,
            run_length,
            max_occurrences,
        }
    }

    pub fn default_params() -> Self {
        Self::new(20, 3, 6)
    }

    fn longest_run(digits: &[u8]) -> Option<(u8, usize)> {
        let mut best: Option<(u8, usize)> = None;
        let mut current: Option<(u8, usize)> = None;
        for &d in digits {
            current = match current {
                Some((v, n)) if v == d => Some((v, n + 1)),
                _ => Some((d, 1)),
            };
            if let Some((v, n)) = current {
                if best.map_or(true, |(_, b)| n > b) {
                    best = Some((v, n));
                }
            }
        }
        best
    }
}

impl RegimeGate for AnomalyGate {
    fn name(&self) -> &str {
        "anomaly"
    }

    fn evaluate(&self, history: &OutcomeHistory) -> GateVerdict {
        if history.len() < self.window {
            return GateVerdict::Passed;
        }
        let digits = history.recent_raw(self.window);

        if let Some((digit, run)) = Self::longest_run(&digits) {
            if run >= self.run_length {
                return GateVerdict::Anomalous {
                    detail: format!("digit {digit} repeated {run} times in a row"),
                };
            }
        }

        let mut counts = [0usize; 256];
        for &d in &digits {
            counts[usize::from(d)] += 1;
        }
        if let Some((digit, &count)) = counts
            .iter()
            .enumerate()
            .find(|(_, &c)| c > self.max_occurrences)
        {
            return GateVerdict::Anomalous {
                detail: format!("digit {digit} occurred {count} times in {}", self.window),
            };
        }

        GateVerdict::Passed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CategoryRule, Outcome, PeriodId};

    fn history_from(digits: &[u8]) -> OutcomeHistory {
        let mut h = OutcomeHistory::new(100);
        for (i, &d) in digits.iter().enumerate() {
            h.append(Outcome::new(PeriodId(i as u64), d, &CategoryRule::default()).unwrap());
        }
        h
    }

    #[test]
    fn triple_repeat_blocks() {
        let h = history_from(&[1, 2, 3, 4, 4, 4, 5, 6]);
        let gate = AnomalyGate::new(8, 3, 6);
        assert!(matches!(gate.evaluate(&h), GateVerdict::Anomalous { .. }));
    }

    #[test]
    fn over_represented_digit_blocks() {
        let h = history_from(&[7, 1, 7, 2, 7, 3, 7, 4]);
        let gate = AnomalyGate::new(8, 3, 3);
        match gate.evaluate(&h) {
            GateVerdict::Anomalous { detail } => assert!(detail.starts_with("digit 7 occurred 4")),
            other => panic!("expected anomaly, got {other:?}"),
        }
    }

    #[test]
    fn varied_digits_pass() {
        let h = history_from(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(AnomalyGate::new(10, 3, 6).evaluate(&h), GateVerdict::Passed);
    }

    #[test]
    fn short_history_passes() {
        let h = history_from(&[4, 4, 4]);
        assert_eq!(AnomalyGate::new(20, 3, 6).evaluate(&h), GateVerdict::Passed);
    }
}
