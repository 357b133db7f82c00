// Shared test helpers
#![allow(dead_code)]

use netbakeoff::models::*;

pub const MINUTE_MS: i64 = 60_000;

pub const TEST_CONFIG: &str = r#"
[store]
data_dir = "data"
phase_file = "phase.txt"

[cache]
path = "data/derived.db"

[bucketing]
duration_secs = 60

[thresholds.lan]
latency_p95_threshold_ms = 20.0
jitter_p95_threshold_ms = 10.0
combine = "any"

[thresholds.wan]
latency_p95_threshold_ms = 100.0
jitter_p95_threshold_ms = 30.0
combine = "any"
"#;

pub fn sample(source: Source, ts: i64, latency_ms: f64, phase: &str) -> Sample {
    Sample::new(ts, source, latency_ms, phase)
}

/// One sample per second for each latency, starting at `start_ms`.
pub fn per_second(source: Source, start_ms: i64, latencies: &[f64], phase: &str) -> Vec<Sample> {
    latencies
        .iter()
        .enumerate()
        .map(|(i, l)| sample(source, start_ms + (i as i64) * 1000, *l, phase))
        .collect()
}

pub fn bucket_ref(source: Source, phase: &str, start_ms: i64) -> BucketRef {
    BucketRef {
        source,
        phase: phase.into(),
        start_ms,
        duration_ms: MINUTE_MS,
    }
}

pub fn flag(source: Source, phase: &str, start_ms: i64, is_bad: bool) -> BadMomentFlag {
    BadMomentFlag {
        bucket: bucket_ref(source, phase, start_ms),
        is_bad,
        reason: if is_bad {
            BadReason::LatencyP95
        } else {
            BadReason::Fine
        },
    }
}

/// A cached row with the given p95 latency/jitter and verdict.
pub fn scored(
    source: Source,
    phase: &str,
    start_ms: i64,
    p95_latency_ms: f64,
    p95_jitter_ms: f64,
    is_bad: bool,
) -> ScoredBucket {
    let bucket = bucket_ref(source, phase, start_ms);
    ScoredBucket {
        metrics: BucketMetrics {
            bucket: bucket.clone(),
            sample_count: 60,
            median_latency_ms: p95_latency_ms / 2.0,
            p95_latency_ms,
            p95_jitter_ms,
            mean_latency_ms: p95_latency_ms / 2.0,
            max_latency_ms: p95_latency_ms * 2.0,
        },
        flag: flag(source, phase, start_ms, is_bad),
    }
}
