//! Error types for the attack engine.
//!
//! Transport failures never show up here: a failed probe is simply a missing
//! sample. Only configuration problems, worker-spawn failures and summary
//! persistence can fail a call.

use thiserror::Error;

/// Result alias used across `timeleak-core`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the engine.
#[derive(Debug, Error)]
pub enum Error {
    /// The run configuration was rejected before any traffic was sent.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A sampling round could not schedule its workers.
    #[error("failed to spawn sampling worker: {0}")]
    Sampler(#[source] std::io::Error),

    /// The transport could not be constructed.
    #[error("transport setup failed: {0}")]
    Transport(String),

    /// Writing a run summary failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing a run summary failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A configuration value that cannot drive an attack.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("alphabet must contain at least one symbol")]
    EmptyAlphabet,

    #[error("alphabet contains duplicate symbol {0:?}")]
    DuplicateSymbol(char),

    #[error("pruning width (top_k) must be at least 1")]
    ZeroPruningWidth,

    #[error("max_length must be at least 1")]
    ZeroMaxLength,

    #[error("secret length must be at least 1")]
    ZeroLength,

    #[error("{stage} stage needs at least one sample per probe")]
    ZeroSamples { stage: &'static str },

    #[error("{stage} stage needs at least one worker")]
    ZeroWorkers { stage: &'static str },

    #[error("probe timeout must be non-zero")]
    ZeroTimeout,
}
