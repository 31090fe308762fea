//! Concurrent latency sampling.
//!
//! One call is one sampling round: the round's `n` invocations are spread over
//! at most `w` scoped worker threads. Workers claim invocations one at a time
//! from a shared counter, so a probe stuck waiting for its timeout only holds
//! up its own worker. Each worker keeps its own sample buffer and the scope
//! joins every worker before the buffers are merged.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use log::{debug, warn};

use crate::config::StageParams;
use crate::error::{Error, Result};
use crate::transport::Transport;

/// Measure `probe` `params.samples` times with at most `params.workers` in
/// flight, returning the latencies (seconds) of the invocations that
/// succeeded.
///
/// Blocks until every invocation has completed or timed out. An all-failed
/// round returns an empty vector. Only a failure to spawn the first worker is
/// an error; if later spawns fail, the workers already running share the
/// round.
pub fn sample<T>(transport: &T, probe: &str, params: StageParams) -> Result<Vec<f64>>
where
    T: Transport + ?Sized,
{
    let n = params.samples;
    if n == 0 {
        return Ok(Vec::new());
    }
    let width = params.workers.clamp(1, n);
    let next = AtomicUsize::new(0);

    let (samples, spawned) = thread::scope(|s| -> Result<(Vec<f64>, usize)> {
        let next = &next;
        let mut handles = Vec::with_capacity(width);

        for i in 0..width {
            let worker = thread::Builder::new()
                .name(format!("sampler-{i}"))
                .spawn_scoped(s, move || drain(transport, probe, n, next));
            match worker {
                Ok(h) => handles.push(h),
                Err(e) if handles.is_empty() => return Err(Error::Sampler(e)),
                Err(e) => {
                    warn!(
                        "worker {i} could not be spawned ({e}), {} workers share the round",
                        handles.len()
                    );
                    break;
                }
            }
        }

        let spawned = handles.len();
        let mut samples = Vec::with_capacity(n);
        for handle in handles {
            match handle.join() {
                Ok(part) => samples.extend(part),
                Err(_) => warn!("sampling worker panicked; its samples are dropped"),
            }
        }
        Ok((samples, spawned))
    })?;

    if samples.is_empty() {
        warn!("every probe of {probe:?} failed ({n} attempts)");
    }
    debug!(
        "sampled {probe:?}: {}/{} succeeded ({} workers)",
        samples.len(),
        n,
        spawned
    );
    Ok(samples)
}

/// Claim invocations until `n` have been handed out, keeping the successful
/// latencies.
fn drain<T>(transport: &T, probe: &str, n: usize, next: &AtomicUsize) -> Vec<f64>
where
    T: Transport + ?Sized,
{
    let mut out = Vec::new();
    while next.fetch_add(1, Ordering::Relaxed) < n {
        if let Some(d) = transport.probe(probe) {
            out.push(d.as_secs_f64());
        }
    }
    out
}
