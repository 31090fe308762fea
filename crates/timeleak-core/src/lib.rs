//! # timeleak-core
//!
//! **Recover secrets from services that leak through response latency.**
//!
//! `timeleak-core` is the measurement-and-ranking engine behind the `timeleak`
//! CLI. It samples probe latencies concurrently, collapses noisy samples to a
//! median, and ranks candidate characters with a cheap wide pass followed by
//! an expensive narrow one.
//!
//! ## Quick Start
//!
//! ```no_run
//! use timeleak_core::{Attack, AttackConfig, AttackPlan, HttpTransport, SilentObserver, TargetConfig};
//!
//! let target = TargetConfig::new("student42");
//! let transport = HttpTransport::new(&target).unwrap();
//! let mut attack = Attack::new(&transport, AttackConfig::default()).unwrap();
//!
//! let report = attack.run(AttackPlan::Full, &mut SilentObserver).unwrap();
//! println!("secret: {:?}, accepted: {:?}", report.secret, report.verified);
//! ```
//!
//! ## Architecture
//!
//! Attack → CandidateRanker → sampler → Transport
//!
//! - [`Transport`] sends one probe and returns its latency (or nothing).
//! - [`sampler::sample`] runs one round of `n` probes over a scoped pool of
//!   at most `w` workers.
//! - [`stats::median`] is the aggregate every decision is based on.
//! - [`LengthEstimator`] finds the probe length with the highest median.
//! - [`CandidateRanker`] picks the next character, two-stage or simple.
//! - [`Attack`] drives the phases and builds the [`RunReport`].

pub mod attack;
pub mod config;
pub mod error;
pub mod length;
pub mod probe;
pub mod ranker;
pub mod sampler;
pub mod stats;
pub mod summary;
pub mod transport;

pub use attack::{
    Attack, AttackObserver, AttackPlan, Phase, PositionTrace, RunReport, SilentObserver, StopFlag,
};
pub use config::{AttackConfig, RankingMode, StageParams, TargetConfig};
pub use error::{ConfigError, Error, Result};
pub use length::{LengthEstimate, LengthEstimator, LengthRecord, LengthScan};
pub use ranker::{CandidateRanker, CandidateRecord, Choice, RankingTrace};
pub use stats::{ZERO_SENTINEL, fmt_secs, median};
pub use summary::{RunSummary, SummaryPaths, SummaryWriter};
pub use transport::{HttpTransport, Transport};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
