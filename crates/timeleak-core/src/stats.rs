//! Robust aggregation of latency samples.
//!
//! Latency distributions over a network are long-tailed: scheduler hiccups,
//! GC pauses on the target and transient congestion all add large positive
//! outliers. The median ignores them where a mean would not.

/// Aggregate reported for a round that produced no samples.
///
/// Ranks below every real measurement since latencies are non-negative and
/// a real round-trip is never exactly zero.
pub const ZERO_SENTINEL: f64 = 0.0;

/// Median of `samples`, or [`ZERO_SENTINEL`] when empty.
///
/// For an even count the two middle values are averaged.
pub fn median(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return ZERO_SENTINEL;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Descending order on aggregate latency.
///
/// Used with a stable sort so equal values keep their original order.
pub fn descending(a: f64, b: f64) -> std::cmp::Ordering {
    b.total_cmp(&a)
}

/// Format seconds with 12 decimal places, e.g. `0.000123456789s`.
pub fn fmt_secs(secs: f64) -> String {
    format!("{secs:.12}s")
}
