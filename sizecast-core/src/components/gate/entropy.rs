//! Entropy gate — flags a chaotic regime.
//!
//! Computes the Shannon entropy (bits) of the category frequencies over the
//! last `window` outcomes. For two classes the maximum is 1.0; above
//! `ceiling` the regime counts as chaotic.

use crate::domain::Category;
use crate::history::OutcomeHistory;

use super::{GateVerdict, RegimeGate};

#[derive(Debug, Clone)]
pub struct EntropyGate {
    pub window: usize,
    pub ceiling: f64,
}

impl EntropyGate {
    pub fn new(window: usize, ceiling: f64) -> Self {
        assert!(window >= 2, "window must be >= 2");
        assert!(ceiling > 0.0, "ceiling must be > 0");
        Self { window, ceiling }
    }

    pub fn default_params() -> Self {
        Self::new(20, 0.99)
    }
}

/// Shannon entropy in bits of the category distribution of `categories`.
pub fn category_entropy(categories: &[Category]) -> f64 {
    if categories.is_empty() {
        return 0.0;
    }
    let n = categories.len() as f64;
    let mut counts = [0usize; 2];
    for c in categories {
        counts[c.index()] += 1;
    }
    counts
        .iter()
        .filter(|&&k| k > 0)
        .map(|&k| {
            let p = k as f64 / n;
            -p * p.log2()
        })
        .sum()
}

impl RegimeGate for EntropyGate {
    fn name(&self) -> &str {
        "entropy"
    }

    fn evaluate(&self, history: &OutcomeHistory) -> GateVerdict {
        if history.len() < self.window {
            return GateVerdict::Passed;
        }
        let entropy = category_entropy(&history.recent_categories(self.window));
        if entropy > self.ceiling {
            GateVerdict::Chaotic { entropy }
        } else {
            GateVerdict::Passed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CategoryRule, Outcome, PeriodId};

    fn history_from(pattern: &str) -> OutcomeHistory {
        let mut h = OutcomeHistory::new(100);
        for (i, ch) in pattern.chars().enumerate() {
            let raw = if ch == 'B' { 7 } else { 1 };
            h.append(Outcome::new(PeriodId(i as u64), raw, &CategoryRule::default()).unwrap());
        }
        h
    }

    #[test]
    fn entropy_bounds() {
        use Category::*;
        assert_eq!(category_entropy(&[Big, Big, Big]), 0.0);
        assert!((category_entropy(&[Big, Small]) - 1.0).abs() < 1e-12);
        assert_eq!(category_entropy(&[]), 0.0);
    }

    #[test]
    fn balanced_window_is_chaotic() {
        let h = history_from("BSBSBSBSBS");
        let gate = EntropyGate::new(10, 0.99);
        assert!(matches!(gate.evaluate(&h), GateVerdict::Chaotic { .. }));
    }

    #[test]
    fn skewed_window_passes() {
        let h = history_from("BBBBBBBSBS");
        let gate = EntropyGate::new(10, 0.99);
        assert_eq!(gate.evaluate(&h), GateVerdict::Passed);
    }

    #[test]
    fn short_history_passes() {
        let h = history_from("BS");
        assert_eq!(EntropyGate::new(10, 0.5).evaluate(&h), GateVerdict::Passed);
    }
}
