//! Run configuration.
//!
//! An [`AttackConfig`] is built once (defaults, JSON file, CLI overrides),
//! validated, and then handed to the orchestrator by value. Nothing in the
//! engine reads process-wide defaults.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Lowercase Latin letters.
pub const DEFAULT_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz";

/// Symbol used to pad probes and to build length probes.
pub const DEFAULT_FILLER: char = 'a';

/// Longest secret probed during length discovery.
pub const DEFAULT_MAX_LENGTH: usize = 32;

/// Default base URL of the target service.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1";

/// Response body marker that signals an accepted secret.
pub const DEFAULT_SUCCESS_MARKER: &str = "1";

/// How each character position is ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RankingMode {
    /// Quick pass over the whole alphabet, full pass over the top `k`.
    #[default]
    TwoStage,
    /// Every symbol measured once with the simple-stage parameters.
    Simple,
}

impl std::fmt::Display for RankingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TwoStage => write!(f, "ranking"),
            Self::Simple => write!(f, "simple"),
        }
    }
}

/// Sample count and pool width for one kind of sampling round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageParams {
    /// Probe invocations per round.
    pub samples: usize,
    /// Maximum invocations in flight at once.
    pub workers: usize,
}

impl StageParams {
    pub const fn new(samples: usize, workers: usize) -> Self {
        Self { samples, workers }
    }

    fn validate(&self, stage: &'static str) -> std::result::Result<(), ConfigError> {
        if self.samples == 0 {
            return Err(ConfigError::ZeroSamples { stage });
        }
        if self.workers == 0 {
            return Err(ConfigError::ZeroWorkers { stage });
        }
        Ok(())
    }
}

/// Immutable parameters for one attack run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackConfig {
    /// Candidate symbols, in tie-break order.
    pub alphabet: String,
    /// Padding symbol.
    pub filler: char,
    /// Upper bound for length discovery (inclusive).
    pub max_length: usize,
    /// Sampling used while scanning lengths.
    pub length_stage: StageParams,
    /// Two-stage mode, stage 1.
    pub quick: StageParams,
    /// Two-stage mode, stage 2.
    pub full: StageParams,
    /// Single-stage mode.
    pub simple: StageParams,
    /// Survivors of the quick pass.
    pub top_k: usize,
    pub mode: RankingMode,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            alphabet: DEFAULT_ALPHABET.to_string(),
            filler: DEFAULT_FILLER,
            max_length: DEFAULT_MAX_LENGTH,
            length_stage: StageParams::new(8, 8),
            quick: StageParams::new(2, 6),
            full: StageParams::new(6, 8),
            simple: StageParams::new(8, 8),
            top_k: 3,
            mode: RankingMode::TwoStage,
        }
    }
}

impl AttackConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Alphabet as a symbol list, in configured order.
    pub fn symbols(&self) -> Vec<char> {
        self.alphabet.chars().collect()
    }

    /// Pruning width clamped to the alphabet size.
    pub fn effective_top_k(&self) -> usize {
        self.top_k.min(self.alphabet.chars().count())
    }

    /// Reject configurations that cannot drive an attack.
    ///
    /// Runs before any request is issued.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.alphabet.is_empty() {
            return Err(ConfigError::EmptyAlphabet);
        }
        let mut seen = HashSet::new();
        for c in self.alphabet.chars() {
            if !seen.insert(c) {
                return Err(ConfigError::DuplicateSymbol(c));
            }
        }
        if self.max_length == 0 {
            return Err(ConfigError::ZeroMaxLength);
        }
        if self.top_k == 0 {
            return Err(ConfigError::ZeroPruningWidth);
        }
        self.length_stage.validate("length")?;
        match self.mode {
            RankingMode::TwoStage => {
                self.quick.validate("quick")?;
                self.full.validate("full")?;
            }
            RankingMode::Simple => self.simple.validate("simple")?,
        }
        Ok(())
    }
}

/// Where and how probes are sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub base_url: String,
    /// Identity the target derives its secret from.
    pub user: String,
    /// Target-side cost knob.
    pub difficulty: u32,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    pub success_marker: String,
}

impl TargetConfig {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user: user.into(),
            difficulty: 1,
            timeout_ms: 10_000,
            success_marker: DEFAULT_SUCCESS_MARKER.to_string(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}
