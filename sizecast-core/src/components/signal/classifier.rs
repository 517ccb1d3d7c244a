//! Classifier signal — a logistic model over recent categories.
//!
//! Each training sample describes the outcomes before one period: the last
//! six categories (Big = 1, missing = 0), the length of the trailing run
//! (capped at nine, scaled to `[0, 1]`) and the last raw digit mod 3. The
//! label is the category that followed. The model is fit by batch gradient
//! descent from zero weights, so a fit is deterministic for a given history.
//!
//! Fits run on the most recent `train_size` samples every `retrain_every`
//! appends, and only when both categories are present. Until the first
//! successful fit the signal abstains.

use tracing::debug;

use crate::domain::Category;
use crate::history::OutcomeHistory;

use super::{OutcomeSignal, SignalVote};

const LAGS: usize = 6;
const MAX_STREAK: usize = 9;
/// Lags, streak, digit mod 3 and a bias term.
const FEATURES: usize = LAGS + 3;

#[derive(Debug, Clone)]
pub struct ClassifierSignal {
    pub train_size: usize,
    pub retrain_every: usize,
    pub min_history: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    pub l2: f64,
    weights: Option<[f64; FEATURES]>,
    since_fit: usize,
}

impl ClassifierSignal {
    pub fn new(
        train_size: usize,
        retrain_every: usize,
        min_history: usize,
        epochs: usize,
        learning_rate: f64,
        l2: f64,
    ) -> Self {
        assert!(train_size >= 2, "train_size must be >= 2");
        assert!(retrain_every >= 1, "retrain_every must be >= 1");
        assert!(epochs >= 1, "epochs must be >= 1");
        assert!(
            learning_rate.is_finite() && learning_rate > 0.0,
            "learning_rate must be > 0"
        );
        assert!(l2.is_finite() && l2 >= 0.0, "l2 must be >= 0");
        Self {
            train_size,
            retrain_every,
            min_history,
            epochs,
            learning_rate,
            l2,
            weights: None,
            since_fit: 0,
        }
    }

    pub fn default_params() -> Self {
        Self::new(500, 5, 20, 60, 0.5, 0.0)
    }

    pub fn is_trained(&self) -> bool {
        self.weights.is_some()
    }

    /// Model probability that the period after `history` is Big.
    pub fn probability_big(&self, history: &OutcomeHistory) -> Option<f64> {
        let w = self.weights.as_ref()?;
        Some(sigmoid(dot(w, &features(history, history.len()))))
    }

    fn fit(&mut self, history: &OutcomeHistory) {
        self.since_fit = 0;
        let end = history.len();
        let start = end.saturating_sub(self.train_size).max(LAGS);
        let samples: Vec<([f64; FEATURES], f64)> = (start..end)
            .filter_map(|i| history.get(i).map(|o| (features(history, i), o.category.as_unit())))
            .collect();

        let bigs = samples.iter().filter(|(_, y)| *y > 0.5).count();
        if bigs == 0 || bigs == samples.len() {
            debug!(samples = samples.len(), "classifier fit skipped, single category");
            return;
        }

        let n = samples.len() as f64;
        let mut w = [0.0; FEATURES];
        for _ in 0..self.epochs {
            let mut grad = [0.0; FEATURES];
            for (x, y) in &samples {
                let err = sigmoid(dot(&w, x)) - y;
                for (g, xi) in grad.iter_mut().zip(x) {
                    *g += err * xi;
                }
            }
            for (wi, g) in w.iter_mut().zip(&grad) {
                *wi -= self.learning_rate * (g / n + self.l2 * *wi);
            }
        }
        debug!(samples = samples.len(), "classifier refit");
        self.weights = Some(w);
    }
}

/// Features of the outcomes strictly before index `end`.
fn features(history: &OutcomeHistory, end: usize) -> [f64; FEATURES] {
    let at = |back: usize| end.checked_sub(back).and_then(|i| history.get(i));
    let mut x = [0.0; FEATURES];
    for lag in 1..=LAGS {
        if let Some(o) = at(lag) {
            x[lag - 1] = o.category.as_unit();
        }
    }
    if let Some(last) = at(1) {
        let streak = (1..=MAX_STREAK)
            .take_while(|&k| at(k).map_or(false, |o| o.category == last.category))
            .count();
        x[LAGS] = streak as f64 / MAX_STREAK as f64;
        x[LAGS + 1] = f64::from(last.raw_value % 3) / 2.0;
    }
    x[FEATURES - 1] = 1.0;
    x
}

fn dot(w: &[f64; FEATURES], x: &[f64; FEATURES]) -> f64 {
    w.iter().zip(x).map(|(a, b)| a * b).sum()
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl OutcomeSignal for ClassifierSignal {
    fn name(&self) -> &str {
        "classifier"
    }

    fn warmup_len(&self) -> usize {
        self.min_history
    }

    fn context_len(&self) -> usize {
        LAGS
    }

    fn observe(&mut self, history: &OutcomeHistory) {
        self.since_fit += 1;
        if self.since_fit >= self.retrain_every && history.len() >= self.min_history {
            self.fit(history);
        }
    }

    fn retrain(&mut self, history: &OutcomeHistory) {
        self.fit(history);
    }

    fn vote(&self, history: &OutcomeHistory) -> SignalVote {
        if history.len() < self.min_history {
            return SignalVote::abstain(self.name());
        }
        match self.probability_big(history) {
            Some(p) if p > 0.5 => SignalVote::call(self.name(), Category::Big, p),
            Some(p) => SignalVote::call(self.name(), Category::Small, 1.0 - p),
            None => SignalVote::abstain(self.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CategoryRule, Outcome, PeriodId};

    fn push(h: &mut OutcomeHistory, ch: char) {
        let raw = if ch == 'B' { 7 } else { 1 };
        let id = PeriodId(h.len() as u64);
        h.append(Outcome::new(id, raw, &CategoryRule::default()).unwrap());
    }

    fn history_from(pattern: &str) -> OutcomeHistory {
        let mut h = OutcomeHistory::new(1000);
        for ch in pattern.chars() {
            push(&mut h, ch);
        }
        h
    }

    #[test]
    fn abstains_until_trained() {
        let signal = ClassifierSignal::default_params();
        assert!(!signal.is_trained());
        let h = history_from(&"BS".repeat(20));
        assert_eq!(signal.vote(&h), SignalVote::abstain("classifier"));
    }

    #[test]
    fn learns_alternation() {
        let mut signal = ClassifierSignal::default_params();
        let h = history_from(&"BS".repeat(30));
        signal.retrain(&h);
        assert!(signal.is_trained());

        let vote = signal.vote(&h);
        assert_eq!(vote.prediction, Some(Category::Big));
        assert!(vote.confidence > 0.8, "confidence {}", vote.confidence);

        let mut h = h;
        push(&mut h, 'B');
        let vote = signal.vote(&h);
        assert_eq!(vote.prediction, Some(Category::Small));
        assert!(vote.confidence > 0.8);
    }

    #[test]
    fn single_category_never_fits() {
        let mut signal = ClassifierSignal::default_params();
        let h = history_from(&"B".repeat(40));
        signal.retrain(&h);
        assert!(!signal.is_trained());
        assert!(!signal.vote(&h).is_active());
    }

    #[test]
    fn refits_on_cadence_once_warm() {
        let mut signal = ClassifierSignal::new(500, 5, 10, 20, 0.5, 0.0);
        let mut h = OutcomeHistory::new(100);
        for (i, ch) in "BSBSBSBSB".chars().enumerate() {
            push(&mut h, ch);
            signal.observe(&h);
            assert!(!signal.is_trained(), "trained early at {}", i + 1);
        }
        push(&mut h, 'S');
        signal.observe(&h);
        assert!(signal.is_trained());
    }

    #[test]
    fn features_describe_the_trailing_run() {
        let h = history_from("SBBB");
        let x = features(&h, h.len());
        assert_eq!(&x[..LAGS], &[1.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
        assert_eq!(x[LAGS], 3.0 / 9.0);
        // Raw 7 mod 3 is 1.
        assert_eq!(x[LAGS + 1], 0.5);
        assert_eq!(x[FEATURES - 1], 1.0);

        let empty = features(&h, 0);
        assert_eq!(&empty[..FEATURES - 1], &[0.0; FEATURES - 1]);
    }
}
