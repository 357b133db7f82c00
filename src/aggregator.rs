// Per-bucket order statistics: nearest-rank median/p95 over latencies and
// p95 over consecutive-sample jitter. Pure; safe to run across buckets in parallel.

use rayon::prelude::*;

use crate::error::InsufficientSamples;
use crate::models::{Bucket, BucketMetrics, Observation};

pub const MEDIAN_PERCENTILE: u32 = 50;
pub const P95_PERCENTILE: u32 = 95;

/// Nearest-rank percentile over an ascending slice: 0-based index
/// `ceil(p * n / 100) - 1`, computed in integers. None for an empty slice.
pub fn nearest_rank(sorted: &[f64], percentile: u32) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let n = sorted.len();
    let rank = (n * percentile.min(100) as usize).div_ceil(100);
    let idx = rank.saturating_sub(1).min(n - 1);
    Some(sorted[idx])
}

/// Absolute differences between consecutive observations in timestamp order.
pub fn jitter_series(observations: &[Observation]) -> Vec<f64> {
    let mut ordered = observations.to_vec();
    ordered.sort_by(|a, b| {
        a.timestamp_ms
            .cmp(&b.timestamp_ms)
            .then(a.latency_ms.total_cmp(&b.latency_ms))
    });
    ordered
        .windows(2)
        .map(|w| (w[1].latency_ms - w[0].latency_ms).abs())
        .collect()
}

/// Metrics for one sealed bucket. Empty buckets are signaled, not zero-filled.
pub fn aggregate(bucket: &Bucket) -> Result<BucketMetrics, InsufficientSamples> {
    if bucket.is_empty() {
        return Err(InsufficientSamples {
            bucket: bucket.key.clone(),
        });
    }

    let mut latencies: Vec<f64> = bucket.observations.iter().map(|o| o.latency_ms).collect();
    latencies.sort_by(f64::total_cmp);

    let mut jitter = jitter_series(&bucket.observations);
    jitter.sort_by(f64::total_cmp);

    let n = latencies.len();
    let (Some(median), Some(p95), Some(max)) = (
        nearest_rank(&latencies, MEDIAN_PERCENTILE),
        nearest_rank(&latencies, P95_PERCENTILE),
        latencies.last().copied(),
    ) else {
        return Err(InsufficientSamples {
            bucket: bucket.key.clone(),
        });
    };

    Ok(BucketMetrics {
        bucket: bucket.key.clone(),
        sample_count: n,
        median_latency_ms: median,
        p95_latency_ms: p95,
        p95_jitter_ms: nearest_rank(&jitter, P95_PERCENTILE).unwrap_or(0.0),
        mean_latency_ms: latencies.iter().sum::<f64>() / n as f64,
        max_latency_ms: max,
    })
}

/// Aggregates many buckets in parallel, keeping input order. Empty buckets
/// come back separately so callers can log and skip them.
pub fn aggregate_all(buckets: &[Bucket]) -> (Vec<BucketMetrics>, Vec<InsufficientSamples>) {
    let results: Vec<Result<BucketMetrics, InsufficientSamples>> =
        buckets.par_iter().map(aggregate).collect();

    let mut metrics = Vec::with_capacity(results.len());
    let mut skipped = Vec::new();
    for r in results {
        match r {
            Ok(m) => metrics.push(m),
            Err(e) => skipped.push(e),
        }
    }
    (metrics, skipped)
}
