//! Integration tests for timeleak-core.
//!
//! These tests drive the public API end to end against in-process targets:
//! sampling → median → length scan → ranking → orchestration → verification.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use timeleak_core::{
    Attack, AttackConfig, AttackPlan, CandidateRanker, LengthEstimator, RankingMode,
    RankingTrace, SilentObserver, StageParams, Transport, ZERO_SENTINEL, median,
};

/// 1.0 s for probes of exactly `len` characters, 0.1 s otherwise.
struct ExactLength(usize);

impl Transport for ExactLength {
    fn probe(&self, candidate: &str) -> Option<Duration> {
        let secs = if candidate.chars().count() == self.0 { 1.0 } else { 0.1 };
        Some(Duration::from_secs_f64(secs))
    }

    fn verify(&self, _candidate: &str) -> bool {
        false
    }
}

/// 0.5 s when the third character is 'q', 0.1 s otherwise.
struct ThirdIsQ;

impl Transport for ThirdIsQ {
    fn probe(&self, candidate: &str) -> Option<Duration> {
        let secs = if candidate.chars().nth(2) == Some('q') { 0.5 } else { 0.1 };
        Some(Duration::from_secs_f64(secs))
    }

    fn verify(&self, _candidate: &str) -> bool {
        false
    }
}

/// Every request times out.
struct Unreachable;

impl Transport for Unreachable {
    fn probe(&self, _candidate: &str) -> Option<Duration> {
        None
    }

    fn verify(&self, _candidate: &str) -> bool {
        false
    }
}

/// Early-exit comparison with periodic large outliers on arbitrary probes.
///
/// Every fifth request takes 5 s regardless of content, mimicking GC pauses
/// on the target. A mean would be dragged around by these; a median is not.
struct JitteryTarget {
    secret: &'static str,
    counter: AtomicUsize,
}

impl JitteryTarget {
    fn new(secret: &'static str) -> Self {
        Self {
            secret,
            counter: AtomicUsize::new(0),
        }
    }
}

impl Transport for JitteryTarget {
    fn probe(&self, candidate: &str) -> Option<Duration> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        if n % 5 == 4 {
            return Some(Duration::from_secs(5));
        }
        let secret: Vec<char> = self.secret.chars().collect();
        let guess: Vec<char> = candidate.chars().collect();
        let mut cost = 0.001 * guess.len().min(secret.len()) as f64;
        if guess.len() == secret.len() {
            let matched = guess.iter().zip(&secret).take_while(|(a, b)| a == b).count();
            cost += 0.01 + 0.01 * matched as f64;
        }
        Some(Duration::from_secs_f64(cost))
    }

    fn verify(&self, candidate: &str) -> bool {
        candidate == self.secret
    }
}

#[test]
fn length_scan_finds_exact_length() {
    let estimate = LengthEstimator::new(&ExactLength(5), 'a', StageParams::new(3, 3))
        .estimate(8)
        .unwrap()
        .unwrap();
    assert_eq!(estimate.length, 5);
    assert_eq!(estimate.median, 1.0);
}

#[test]
fn length_scan_is_repeatable() {
    let estimator = LengthEstimator::new(&ExactLength(7), 'a', StageParams::new(2, 4));
    let a = estimator.estimate(10).unwrap().unwrap().length;
    let b = estimator.estimate(10).unwrap().unwrap().length;
    assert_eq!(a, b);
    assert_eq!(a, 7);
}

#[test]
fn both_modes_select_q_at_third_position() {
    for mode in [RankingMode::TwoStage, RankingMode::Simple] {
        let cfg = AttackConfig {
            mode,
            ..Default::default()
        };
        let choice = CandidateRanker::new(&ThirdIsQ, &cfg).rank("ab", 6).unwrap();
        assert_eq!(choice.symbol, 'q', "mode {mode}");
        assert_eq!(choice.method, mode);
    }
}

#[test]
fn timed_out_round_ties_in_alphabet_order() {
    let cfg = AttackConfig {
        mode: RankingMode::Simple,
        simple: StageParams::new(4, 2),
        ..Default::default()
    };
    let choice = CandidateRanker::new(&Unreachable, &cfg).rank("", 3).unwrap();
    let RankingTrace::Simple { results } = choice.trace else {
        panic!("expected simple trace");
    };
    assert!(results.iter().all(|r| r.median == ZERO_SENTINEL));
    let order: String = results.iter().map(|r| r.symbol).collect();
    assert_eq!(order, cfg.alphabet);
    assert_eq!(choice.symbol, 'a');
}

#[test]
fn median_ignores_gc_pauses() {
    let samples = [0.011, 0.012, 5.0, 0.011, 0.013];
    let m = median(&samples);
    assert!(m < 0.02, "median {m} dragged by outlier");
}

#[test]
fn full_attack_survives_outliers() {
    let target = JitteryTarget::new("kfcgd");
    let cfg = AttackConfig {
        alphabet: "abcdefghijkl".to_string(),
        max_length: 8,
        length_stage: StageParams::new(5, 5),
        quick: StageParams::new(5, 5),
        full: StageParams::new(11, 4),
        top_k: 4,
        ..Default::default()
    };
    let mut attack = Attack::new(&target, cfg).unwrap();
    let report = attack.run(AttackPlan::Full, &mut SilentObserver).unwrap();

    assert_eq!(report.estimated_length, Some(5));
    assert_eq!(report.secret.as_deref(), Some("kfcgd"));
    assert_eq!(report.verified, Some(true));
    assert_eq!(report.positions.len(), 5);
    for (i, p) in report.positions.iter().enumerate() {
        assert_eq!(p.position, i);
        let RankingTrace::TwoStage { quick, full } = &p.ranking else {
            panic!("expected two-stage trace");
        };
        assert_eq!(quick.len(), 12);
        assert_eq!(full.len(), 4);
    }
}

#[test]
fn unreachable_target_still_produces_a_report() {
    let cfg = AttackConfig {
        max_length: 4,
        length_stage: StageParams::new(2, 2),
        quick: StageParams::new(1, 1),
        full: StageParams::new(1, 1),
        ..Default::default()
    };
    let mut attack = Attack::new(&Unreachable, cfg).unwrap();
    let report = attack.run(AttackPlan::Full, &mut SilentObserver).unwrap();
    // All medians are zero: the smallest length wins and every position
    // falls back to the first symbol.
    assert_eq!(report.estimated_length, Some(1));
    assert_eq!(report.secret.as_deref(), Some("a"));
    assert_eq!(report.verified, Some(false));
}
