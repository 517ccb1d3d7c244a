//! End-to-end engine scenarios: seed pattern, loss escalation into recovery
//! observation under both trigger-loss policies, weight adaptation, regime
//! gates, session reset, idempotence and fallback determinism.

use sizecast_core::components::fusion::WeightAdaptation;
use sizecast_core::components::signal::SignalVote;
use sizecast_core::config::{ComponentConfig, FusionConfig, RiskConfig, SessionConfig};
use sizecast_core::domain::{SkipReason, StakeTier};
use sizecast_core::{
    Category, Engine, EngineConfig, GradedResult, IngestStatus, Mode, PeriodId, Prediction,
    RawObservation, SessionStats, TriggerLossPolicy,
};

// ── Helpers ──────────────────────────────────────────────────────────

const BIG: u8 = 7;
const SMALL: u8 = 1;

/// Momentum over one outcome with full confidence: always calls the last
/// category at strength 1.0.
fn follower_config() -> EngineConfig {
    EngineConfig {
        signals: vec![ComponentConfig::new(
            "momentum",
            &[("window", 1.0), ("weighted", 0.0), ("band", 0.0), ("fixed_confidence", 1.0)],
        )],
        gates: Vec::new(),
        fusion: FusionConfig::default(),
        ..EngineConfig::default()
    }
}

fn ingest_all(engine: &mut Engine, start: u64, raws: &[u8]) -> Vec<IngestStatus> {
    raws.iter()
        .enumerate()
        .map(|(i, &raw)| engine.ingest(PeriodId(start + i as u64), raw).unwrap())
        .collect()
}

fn graded(status: &IngestStatus) -> Option<GradedResult> {
    match status {
        IngestStatus::Accepted { graded, .. } => graded.map(|e| e.result),
        IngestStatus::Ignored { .. } => None,
    }
}

// ── Seed pattern ─────────────────────────────────────────────────────

fn seed_config() -> EngineConfig {
    EngineConfig {
        signals: vec![
            ComponentConfig::new(
                "pattern",
                &[("max_depth", 3.0), ("min_depth", 3.0), ("min_matches", 1.0), ("min_history", 0.0)],
            ),
            ComponentConfig::new("markov", &[]),
        ],
        gates: Vec::new(),
        fusion: FusionConfig::default(),
        ..EngineConfig::default()
    }
}

#[test]
fn alternating_seed_predicts_small() {
    let mut engine = Engine::new(seed_config()).unwrap();
    let statuses = ingest_all(&mut engine, 1, &[BIG, SMALL, BIG, SMALL, BIG]);

    let decision = statuses.last().and_then(IngestStatus::decision).unwrap();
    assert_eq!(decision.period_id, PeriodId(6));
    assert_eq!(decision.votes[0], SignalVote::call("pattern", Category::Small, 1.0));
    assert_eq!(decision.votes[1], SignalVote::abstain("markov"));
    assert_eq!(decision.strength, 1.0);
    assert_eq!(decision.level, 1);
    assert_eq!(decision.mode, Mode::Normal);
    assert_eq!(decision.prediction, Prediction::Call(Category::Small));

    // Earlier periods fell back to the last category at 0.5, below Level 1.
    for status in &statuses[..4] {
        let d = status.decision().unwrap();
        assert_eq!(d.prediction, Prediction::Skip);
        assert_eq!(d.strength, 0.5);
    }
}

#[test]
fn seeding_matches_incremental_ingest() {
    let raws = [BIG, SMALL, BIG, SMALL, BIG];
    let mut ingested = Engine::new(seed_config()).unwrap();
    let last = ingest_all(&mut ingested, 1, &raws).pop().unwrap();

    let mut seeded = Engine::new(seed_config()).unwrap();
    let observations: Vec<_> = raws
        .iter()
        .enumerate()
        .map(|(i, &raw)| RawObservation::new(1 + i as u64, raw))
        .collect();
    let summary = seeded.seed(&observations).unwrap();

    assert_eq!(summary.decision.as_ref(), last.decision());
    assert_eq!(seeded.history().category_string(), "BSBSB");
    assert!(seeded.recent_log().is_empty());
}

// ── Loss escalation and recovery observation ─────────────────────────

fn three_losses(policy: TriggerLossPolicy) -> (Engine, Vec<IngestStatus>) {
    let mut config = follower_config();
    config.risk = RiskConfig {
        trigger_loss: policy,
        ..RiskConfig::default()
    };
    let mut engine = Engine::new(config).unwrap();
    // Every call repeats the last category; alternating outcomes lose each time.
    let statuses = ingest_all(&mut engine, 1, &[BIG, SMALL, BIG, SMALL]);
    (engine, statuses)
}

#[test]
fn three_losses_counted_enter_observation() {
    let (engine, statuses) = three_losses(TriggerLossPolicy::Counted);

    let levels: Vec<u8> = statuses.iter().map(|s| s.decision().unwrap().level).collect();
    assert_eq!(levels, vec![1, 2, 3, 1]);
    assert_eq!(graded(&statuses[3]), Some(GradedResult::Loss));

    let stats = engine.stats();
    assert_eq!(stats.losses, 3);
    assert_eq!(stats.current_loss_streak, 3);
    assert_eq!(stats.max_loss_streak, 3);

    let log = engine.recent_log();
    assert!(log[0].recovery_trigger);
    assert!(!log[1].recovery_trigger);

    let next = engine.pending().unwrap();
    assert_eq!(next.mode, Mode::RecoveryObservation);
    assert_eq!(next.prediction, Prediction::Skip);
    assert_eq!(next.skip_reason, Some(SkipReason::Observation));
    assert_eq!(next.ghost, Some(Category::Small));

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.risk.mode, Mode::RecoveryObservation);
    assert_eq!(snapshot.risk.observation_turns_remaining, 3);
    assert_eq!(snapshot.recovery_entries, 1);
}

#[test]
fn three_losses_ghost_policy_counts_two() {
    let (engine, statuses) = three_losses(TriggerLossPolicy::Ghost);

    assert_eq!(graded(&statuses[3]), Some(GradedResult::Observed));
    let stats = engine.stats();
    assert_eq!(stats.losses, 2);
    assert_eq!(stats.current_loss_streak, 2);

    let log = engine.recent_log();
    assert_eq!(log[0].result, GradedResult::Observed);
    assert!(log[0].recovery_trigger);
    assert_eq!(engine.risk_state().mode, Mode::RecoveryObservation);
    assert_eq!(engine.risk_state().observation_turns_remaining, 3);
}

#[test]
fn observation_lasts_configured_turns_and_leaves_stats_alone() {
    let (mut engine, _) = three_losses(TriggerLossPolicy::Counted);
    let frozen = engine.stats();

    // Decisions for periods 5, 6, 7 are observation; period 8 is live again.
    let statuses = ingest_all(&mut engine, 5, &[BIG, SMALL, BIG]);
    for status in &statuses[..2] {
        assert_eq!(status.decision().unwrap().mode, Mode::RecoveryObservation);
    }
    for status in &statuses {
        assert_eq!(graded(status), Some(GradedResult::Observed));
    }
    assert_eq!(engine.stats(), frozen);
    assert_eq!(engine.risk_state().observation_turns_remaining, 0);

    let resumed = statuses[2].decision().unwrap();
    assert_eq!(resumed.period_id, PeriodId(8));
    assert_eq!(resumed.mode, Mode::Normal);
    assert_eq!(resumed.level, 1);
    assert_eq!(resumed.prediction, Prediction::Call(Category::Big));
    // Three losses on the board still mark the stake as recovery.
    assert_eq!(resumed.tier, Some(StakeTier::Recovery));
}

#[test]
fn win_after_escalation_resets_level() {
    let mut engine = Engine::new(follower_config()).unwrap();
    // Loss (B→S), then win (S→S).
    let statuses = ingest_all(&mut engine, 1, &[BIG, SMALL, SMALL]);
    assert_eq!(statuses[1].decision().unwrap().level, 2);
    assert_eq!(graded(&statuses[2]), Some(GradedResult::Win));
    assert_eq!(statuses[2].decision().unwrap().level, 1);
    assert_eq!(engine.stats().current_loss_streak, 0);
}

// ── Weight adaptation ────────────────────────────────────────────────

fn adaptive_follower() -> EngineConfig {
    let mut config = follower_config();
    config.fusion.adaptation = Some(WeightAdaptation {
        reward: 1.5,
        penalty: 0.5,
        min_weight: 0.1,
        max_weight: 10.0,
    });
    config
}

#[test]
fn graded_calls_move_weights() {
    let mut engine = Engine::new(adaptive_follower()).unwrap();
    ingest_all(&mut engine, 1, &[BIG]);
    assert_eq!(engine.weights()[0].weight, 1.0);

    let statuses = ingest_all(&mut engine, 2, &[BIG]);
    assert_eq!(graded(&statuses[0]), Some(GradedResult::Win));
    assert_eq!(engine.weights()[0].weight, 1.5);

    let statuses = ingest_all(&mut engine, 3, &[SMALL]);
    assert_eq!(graded(&statuses[0]), Some(GradedResult::Loss));
    assert_eq!(engine.weights()[0].weight, 0.75);
}

#[test]
fn observation_periods_still_move_weights() {
    let mut engine = Engine::new(adaptive_follower()).unwrap();
    ingest_all(&mut engine, 1, &[BIG, SMALL, BIG, SMALL]);
    assert_eq!(engine.risk_state().mode, Mode::RecoveryObservation);
    assert_eq!(engine.weights()[0].weight, 0.125);
    let frozen = engine.stats();

    // The observation decision for period 5 follows SMALL and is right.
    let statuses = ingest_all(&mut engine, 5, &[SMALL]);
    assert_eq!(graded(&statuses[0]), Some(GradedResult::Observed));
    assert_eq!(engine.weights()[0].weight, 0.1875);
    assert_eq!(engine.stats(), frozen);

    // Two wrong observation calls, clamped at the floor.
    ingest_all(&mut engine, 6, &[BIG, SMALL]);
    assert_eq!(engine.weights()[0].weight, 0.1);
}

// ── Regime gates ─────────────────────────────────────────────────────

#[test]
fn anomaly_gate_vetoes_a_confident_call() {
    let mut config = follower_config();
    config.gates = vec![ComponentConfig::new(
        "anomaly",
        &[("window", 3.0), ("run_length", 3.0), ("max_occurrences", 3.0)],
    )];
    let mut engine = Engine::new(config).unwrap();
    let statuses = ingest_all(&mut engine, 1, &[BIG, BIG, BIG]);

    assert_eq!(statuses[1].decision().unwrap().prediction, Prediction::Call(Category::Big));
    let vetoed = statuses[2].decision().unwrap();
    assert_eq!(vetoed.prediction, Prediction::Skip);
    assert_eq!(vetoed.strength, 1.0);
    match &vetoed.skip_reason {
        Some(SkipReason::Anomaly { detail }) => assert!(detail.contains("digit 7")),
        other => panic!("expected an anomaly skip, got {other:?}"),
    }
}

fn chaotic_config(thresholds: Vec<f64>) -> EngineConfig {
    let mut config = follower_config();
    config.gates = vec![ComponentConfig::new("entropy", &[("window", 2.0), ("ceiling", 0.5)])];
    config.risk = RiskConfig {
        thresholds,
        ..RiskConfig::default()
    };
    config
}

#[test]
fn chaotic_regime_skips_below_max_level() {
    let mut engine = Engine::new(chaotic_config(vec![0.55, 0.70, 0.85])).unwrap();
    // One loss puts the machine at level 2 of 3; "BS" has entropy 1.0.
    let statuses = ingest_all(&mut engine, 1, &[BIG, SMALL]);
    let d = statuses[1].decision().unwrap();
    assert_eq!(d.level, 2);
    assert_eq!(d.prediction, Prediction::Skip);
    assert!(matches!(d.skip_reason, Some(SkipReason::Chaotic { .. })));
}

#[test]
fn chaotic_regime_calls_at_max_level() {
    let mut engine = Engine::new(chaotic_config(vec![0.55, 0.70])).unwrap();
    let statuses = ingest_all(&mut engine, 1, &[BIG, SMALL]);
    let d = statuses[1].decision().unwrap();
    assert_eq!(d.level, 2);
    assert_eq!(d.skip_reason, None);
    assert_eq!(d.prediction, Prediction::Call(Category::Small));
}

// ── Session reset ────────────────────────────────────────────────────

#[test]
fn session_resets_when_target_reached() {
    let mut config = follower_config();
    config.session = SessionConfig { win_target: 3 };
    let mut engine = Engine::new(config).unwrap();

    let statuses = ingest_all(&mut engine, 1, &[BIG, BIG, BIG, BIG]);
    assert_eq!(graded(&statuses[3]), Some(GradedResult::Win));

    assert_eq!(engine.stats(), SessionStats::default());
    assert_eq!(engine.sessions_completed(), 1);
    assert_eq!(engine.history().len(), 4);
    assert_eq!(engine.risk_state().level, 1);
    assert_eq!(engine.recent_log().len(), 3);

    ingest_all(&mut engine, 5, &[BIG]);
    assert_eq!(engine.stats().wins, 1);
}

// ── Idempotence ──────────────────────────────────────────────────────

#[test]
fn replaying_accepted_periods_changes_nothing() {
    let mut engine = Engine::new(follower_config()).unwrap();
    let raws = [BIG, SMALL, SMALL, BIG, BIG, SMALL];
    ingest_all(&mut engine, 100, &raws);
    let before = engine.snapshot();

    let again = ingest_all(&mut engine, 100, &raws);
    assert!(again.iter().all(|s| !s.is_accepted()));
    assert_eq!(engine.snapshot(), before);
}

// ── Fallback determinism ─────────────────────────────────────────────

#[test]
fn fallback_is_deterministic() {
    let config = EngineConfig {
        risk: RiskConfig {
            thresholds: vec![0.5, 0.7, 0.9],
            ..RiskConfig::default()
        },
        ..seed_config()
    };
    let raws = [BIG, BIG, BIG];

    let run = || {
        let mut engine = Engine::new(config.clone()).unwrap();
        ingest_all(&mut engine, 1, &raws)
    };
    let (a, b) = (run(), run());
    assert_eq!(a, b);

    // No signal has data: repeat the last category at the fallback strength,
    // which clears a 0.5 floor.
    let d = a[2].decision().unwrap();
    assert_eq!(d.prediction, Prediction::Call(Category::Big));
    assert_eq!(d.strength, 0.5);
}

// ── Snapshot publication ─────────────────────────────────────────────

#[test]
fn snapshot_tracks_every_accepted_update() {
    let mut engine = Engine::new(follower_config()).unwrap();
    let reader = engine.reader();
    ingest_all(&mut engine, 1, &[BIG, SMALL, BIG]);

    let snap = reader.load();
    assert_eq!(snap.version, 3);
    assert_eq!(snap.history_len, 3);
    assert_eq!(snap.next_period, Some(PeriodId(4)));
    assert_eq!(snap.recent_categories, "BSB");
    assert_eq!(snap.recent_log.len(), 2);
    assert_eq!(snap.recent_log[0].period_id, PeriodId(3));

    let json = serde_json::to_string(&*snap).unwrap();
    assert!(json.contains("\"recent_categories\":\"BSB\""));
}
