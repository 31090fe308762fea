//! Per-position candidate ranking.
//!
//! Two-stage mode spends a few samples on every symbol, keeps the `k` slowest,
//! and re-measures only those with a larger budget. It is cheaper than simple
//! mode but can drop the right symbol if it happened to measure low in the
//! quick pass. Simple mode measures every symbol once with the full simple
//! budget and has no pruning step.
//!
//! All orderings are stable sorts on descending median, so ties keep the
//! alphabet order.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::{AttackConfig, RankingMode, StageParams};
use crate::error::Result;
use crate::probe::candidate_probe;
use crate::sampler::sample;
use crate::stats::{ZERO_SENTINEL, descending, median};
use crate::transport::Transport;

/// One measured symbol within one ranking stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub symbol: char,
    pub probe: String,
    pub median: f64,
    /// Successful samples behind `median`.
    pub samples: usize,
}

/// The full ranking that led to a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum RankingTrace {
    TwoStage {
        /// Every symbol, ranked.
        quick: Vec<CandidateRecord>,
        /// Survivors re-measured, ranked.
        full: Vec<CandidateRecord>,
    },
    Simple {
        results: Vec<CandidateRecord>,
    },
}

impl RankingTrace {
    /// The final ranking the choice was taken from.
    pub fn final_ranking(&self) -> &[CandidateRecord] {
        match self {
            Self::TwoStage { full, .. } => full,
            Self::Simple { results } => results,
        }
    }
}

/// Decision for one position.
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    pub symbol: char,
    /// Median latency of the chosen symbol's final measurement.
    pub median: f64,
    pub method: RankingMode,
    pub trace: RankingTrace,
}

/// Ranks candidate symbols for the position after a known prefix.
pub struct CandidateRanker<'a, T: Transport + ?Sized> {
    transport: &'a T,
    config: &'a AttackConfig,
}

impl<'a, T: Transport + ?Sized> CandidateRanker<'a, T> {
    pub fn new(transport: &'a T, config: &'a AttackConfig) -> Self {
        Self { transport, config }
    }

    /// Rank with the configured mode.
    pub fn rank(&self, prefix: &str, total_len: usize) -> Result<Choice> {
        match self.config.mode {
            RankingMode::TwoStage => self.rank_two_stage(prefix, total_len),
            RankingMode::Simple => self.rank_simple(prefix, total_len),
        }
    }

    /// Quick pass over the alphabet, prune to `top_k`, full pass on survivors.
    pub fn rank_two_stage(&self, prefix: &str, total_len: usize) -> Result<Choice> {
        let symbols = self.config.symbols();
        let quick: Vec<(char, String)> = symbols
            .iter()
            .map(|&c| (c, candidate_probe(prefix, c, total_len, self.config.filler)))
            .collect();
        let quick = self.measure_all(quick, self.config.quick)?;

        let k = self.config.effective_top_k();
        let mut survivors: Vec<(char, String)> = quick
            .iter()
            .take(k)
            .map(|r| (r.symbol, r.probe.clone()))
            .collect();
        // Full-pass ties break on alphabet order, not on quick-pass rank.
        survivors.sort_by_key(|(c, _)| symbols.iter().position(|s| s == c));
        debug!(
            "position {}: quick pass kept {:?}",
            prefix.chars().count(),
            survivors.iter().map(|(c, _)| *c).collect::<String>()
        );

        let full = self.measure_all(survivors, self.config.full)?;
        Ok(self.choose(
            prefix,
            RankingMode::TwoStage,
            RankingTrace::TwoStage { quick, full },
        ))
    }

    /// Every symbol once with the simple-stage budget.
    pub fn rank_simple(&self, prefix: &str, total_len: usize) -> Result<Choice> {
        let probes: Vec<(char, String)> = self
            .config
            .symbols()
            .into_iter()
            .map(|c| (c, candidate_probe(prefix, c, total_len, self.config.filler)))
            .collect();
        let results = self.measure_all(probes, self.config.simple)?;
        Ok(self.choose(prefix, RankingMode::Simple, RankingTrace::Simple { results }))
    }

    /// Sample each probe in turn, one round at a time, and rank the records.
    fn measure_all(
        &self,
        probes: Vec<(char, String)>,
        params: StageParams,
    ) -> Result<Vec<CandidateRecord>> {
        let mut records = Vec::with_capacity(probes.len());
        for (symbol, probe) in probes {
            let samples = sample(self.transport, &probe, params)?;
            records.push(CandidateRecord {
                symbol,
                median: median(&samples),
                samples: samples.len(),
                probe,
            });
        }
        rank_records(&mut records);
        Ok(records)
    }

    fn choose(&self, prefix: &str, method: RankingMode, trace: RankingTrace) -> Choice {
        let (symbol, median) = trace
            .final_ranking()
            .first()
            .map(|r| (r.symbol, r.median))
            // A validated config never produces an empty ranking.
            .unwrap_or((self.config.filler, ZERO_SENTINEL));
        info!(
            "position {}: chose {symbol:?} (median {median:.9}s, {method})",
            prefix.chars().count()
        );
        Choice {
            symbol,
            median,
            method,
            trace,
        }
    }
}

/// Stable sort by descending median.
pub fn rank_records(records: &mut [CandidateRecord]) {
    records.sort_by(|a, b| descending(a.median, b.median));
}
