//! Secret length discovery.
//!
//! Modeling assumption: the target's work grows with how much of the filler
//! probe it examines and peaks when the probe length equals the secret
//! length. Shorter probes are rejected earlier, longer ones all at the same
//! boundary. Targets that compare differently can produce a wrong answer and
//! nothing here can tell.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::StageParams;
use crate::error::{Error, Result};
use crate::probe::filler_probe;
use crate::sampler::sample;
use crate::stats::median;
use crate::transport::Transport;

/// Aggregate latency observed for one probe length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LengthRecord {
    pub length: usize,
    pub median: f64,
    /// Successful samples behind `median`.
    pub samples: usize,
}

/// Outcome of a length scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LengthEstimate {
    /// Length with the largest median; smallest length on ties.
    pub length: usize,
    pub median: f64,
    /// One record per scanned length, ascending.
    pub records: Vec<LengthRecord>,
}

/// Scans lengths `1..=max_length` with filler probes.
pub struct LengthEstimator<'a, T: Transport + ?Sized> {
    transport: &'a T,
    filler: char,
    params: StageParams,
}

impl<'a, T: Transport + ?Sized> LengthEstimator<'a, T> {
    pub fn new(transport: &'a T, filler: char, params: StageParams) -> Self {
        Self {
            transport,
            filler,
            params,
        }
    }

    /// Measure one length.
    pub fn measure(&self, length: usize) -> Result<LengthRecord> {
        let probe = filler_probe(length, self.filler);
        let samples = sample(self.transport, &probe, self.params)?;
        let record = LengthRecord {
            length,
            median: median(&samples),
            samples: samples.len(),
        };
        debug!(
            "length {:2}: median {:.9}s ({} samples)",
            record.length, record.median, record.samples
        );
        Ok(record)
    }

    /// Scan every length up to `max_length` and pick the peak.
    ///
    /// Returns `None` only when `max_length` is zero.
    pub fn estimate(&self, max_length: usize) -> Result<Option<LengthEstimate>> {
        let scan = self.scan(max_length, || false, |_| {});
        match scan.error {
            Some(e) => Err(e),
            None => Ok(pick_peak(scan.records)),
        }
    }

    /// Measure lengths `1..=max_length` in order.
    ///
    /// `should_stop` is checked before each length and `on_record` sees each
    /// record as it is measured. The scan ends early on a stop request or a
    /// sampler error; records measured so far are kept either way.
    pub fn scan(
        &self,
        max_length: usize,
        should_stop: impl Fn() -> bool,
        mut on_record: impl FnMut(&LengthRecord),
    ) -> LengthScan {
        let mut scan = LengthScan {
            records: Vec::with_capacity(max_length),
            stopped: false,
            error: None,
        };
        for length in 1..=max_length {
            if should_stop() {
                scan.stopped = true;
                break;
            }
            match self.measure(length) {
                Ok(record) => {
                    on_record(&record);
                    scan.records.push(record);
                }
                Err(e) => {
                    scan.error = Some(e);
                    break;
                }
            }
        }
        scan
    }
}

/// Records gathered by [`LengthEstimator::scan`].
#[derive(Debug)]
pub struct LengthScan {
    /// One record per measured length, ascending.
    pub records: Vec<LengthRecord>,
    /// Ended by a stop request.
    pub stopped: bool,
    /// Ended by a sampler error.
    pub error: Option<Error>,
}

impl LengthScan {
    pub fn is_complete(&self) -> bool {
        !self.stopped && self.error.is_none()
    }
}

/// Length with the largest median, preferring the smallest length on ties.
pub fn pick_peak(records: Vec<LengthRecord>) -> Option<LengthEstimate> {
    let mut best: Option<&LengthRecord> = None;
    for r in &records {
        // Strict comparison keeps the first (smallest) length on ties.
        if best.is_none_or(|b| r.median > b.median) {
            best = Some(r);
        }
    }
    let best = best?;
    let (length, median) = (best.length, best.median);
    info!("estimated secret length {length} (median {median:.9}s)");
    Some(LengthEstimate {
        length,
        median,
        records,
    })
}
