//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Incremental tables equal tables rebuilt from scratch, through evictions
//! 2. Per-key follower counts sum to the key's occurrences
//! 3. Vote confidences and fused strength stay in range
//! 4. Re-ingesting any accepted period is a no-op
//! 5. The risk machine never leaves its level range

use proptest::prelude::*;
use sizecast_core::components::fusion::{EnsembleFusion, SourceWeight};
use sizecast_core::components::signal::{
    ClassifierSignal, MarkovSignal, MomentumSignal, OutcomeSignal, PatternSignal,
};
use sizecast_core::components::table::TransitionTable;
use sizecast_core::components::FusedVote;
use sizecast_core::domain::{CategoryRule, Outcome};
use sizecast_core::history::AppendResult;
use sizecast_core::risk::{Mode, RiskStateMachine};
use sizecast_core::{Category, Engine, OutcomeHistory, PeriodId, Preset};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_digits(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..=9, 0..max_len)
}

fn outcome(period: usize, raw: u8) -> Outcome {
    Outcome::new(PeriodId(period as u64), raw, &CategoryRule::default()).unwrap()
}

// ── 1 + 2. Table maintenance ─────────────────────────────────────────

proptest! {
    /// Observe/forget through a bounded history matches a full rebuild.
    #[test]
    fn incremental_table_matches_rebuild(
        digits in arb_digits(300),
        capacity in 1usize..60,
        depth in 1usize..7,
    ) {
        let mut history = OutcomeHistory::new(capacity);
        let mut table = TransitionTable::new(depth);
        for (i, &d) in digits.iter().enumerate() {
            if let AppendResult::Appended { evicted } = history.append(outcome(i, d)) {
                table.observe_latest(&history);
                if let Some(evicted) = evicted {
                    table.forget_oldest(&evicted, &history);
                }
            }
        }

        let mut rebuilt = TransitionTable::new(depth);
        rebuilt.rebuild(&history);
        prop_assert_eq!(&table, &rebuilt);

        let expected = history.len().saturating_sub(depth) as u64;
        prop_assert_eq!(table.total_transitions(), expected);
        for (key, counts) in table.iter() {
            prop_assert_eq!(key.len(), depth);
            prop_assert_eq!(
                counts.total(),
                counts.count(Category::Small) + counts.count(Category::Big)
            );
            prop_assert!(counts.total() > 0);
        }
    }
}

// ── 3. Confidence and strength bounds ────────────────────────────────

proptest! {
    #[test]
    fn votes_and_strength_in_range(digits in arb_digits(120), multiplier in 0.5f64..2.0) {
        let mut history = OutcomeHistory::new(80);
        let mut signals: Vec<Box<dyn OutcomeSignal>> = vec![
            Box::new(PatternSignal::new(&[5, 4, 3], 1, 0)),
            Box::new(MarkovSignal::new(3, 1, 0)),
            Box::new(MomentumSignal::new(5, true, 0.0, None)),
            Box::new(ClassifierSignal::new(60, 5, 10, 10, 0.5, 0.0)),
        ];
        let fusion = EnsembleFusion::new(
            ["pattern", "markov", "momentum", "classifier"]
                .iter()
                .zip([1.0, 0.7, 1.0, 1.4])
                .map(|(s, w)| SourceWeight { source: s.to_string(), weight: w })
                .collect(),
        )
        .with_multiplier(multiplier);

        for (i, &d) in digits.iter().enumerate() {
            if let AppendResult::Appended { evicted } = history.append(outcome(i, d)) {
                for s in &mut signals {
                    s.observe(&history);
                }
                if let Some(evicted) = evicted {
                    for s in &mut signals {
                        s.forget(&evicted, &history);
                    }
                }
            }

            let votes: Vec<_> = signals.iter().map(|s| s.vote(&history)).collect();
            for v in &votes {
                prop_assert!((0.0..=1.0).contains(&v.confidence));
                if v.prediction.is_none() {
                    prop_assert_eq!(v.confidence, 0.0);
                }
            }
            let fused: FusedVote = fusion.combine(&votes, history.last().map(|o| o.category));
            prop_assert!(fused.strength >= 0.0);
            prop_assert!(fused.strength <= multiplier + 1e-9);
        }
    }
}

// ── 4. Idempotence ───────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn reingest_is_noop(digits in arb_digits(60), pick in any::<prop::sample::Index>()) {
        prop_assume!(!digits.is_empty());
        let mut engine = Engine::new(Preset::Balanced.to_config()).unwrap();
        for (i, &d) in digits.iter().enumerate() {
            engine.ingest(PeriodId(i as u64), d).unwrap();
        }
        let before = engine.snapshot();

        let i = pick.index(digits.len());
        let status = engine.ingest(PeriodId(i as u64), digits[i]).unwrap();
        prop_assert!(!status.is_accepted());
        prop_assert_eq!(engine.snapshot(), before);
    }
}

// ── 5. Risk machine ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn risk_level_stays_in_range(
        grades in prop::collection::vec(any::<bool>(), 0..200),
        turns in 1u32..6,
    ) {
        let mut machine = RiskStateMachine::new(vec![0.55, 0.70, 0.85], turns);
        let fused = FusedVote {
            category: Some(Category::Big),
            strength: 1.0,
            buckets: [0.0, 1.0],
            total_weight: 1.0,
            fallback: false,
        };

        for won in grades {
            let decision = machine.decide(&fused, &[]);
            if decision.state.mode == Mode::Normal {
                machine.transition(won);
            } else {
                machine.observation_elapsed();
            }
            let state = machine.state();
            prop_assert!(state.level >= 1 && state.level <= machine.max_level());
            prop_assert!(state.observation_turns_remaining <= turns);
            if state.mode == Mode::RecoveryObservation {
                prop_assert_eq!(state.level, 1);
                prop_assert!(state.observation_turns_remaining >= 1);
            }
        }
    }
}
