// Per-bucket statistics and the bad-moment verdict derived from them.

use serde::{Deserialize, Serialize};

use super::BucketRef;

/// Order statistics for one non-empty bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketMetrics {
    pub bucket: BucketRef,
    pub sample_count: usize,
    pub median_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub p95_jitter_ms: f64,
    pub mean_latency_ms: f64,
    pub max_latency_ms: f64,
}

/// Which threshold(s) a bucket breached. Serializes to snake_case JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadReason {
    Fine,
    LatencyP95,
    JitterP95,
    LatencyAndJitter,
}

impl BadReason {
    pub fn as_str(self) -> &'static str {
        match self {
            BadReason::Fine => "fine",
            BadReason::LatencyP95 => "latency_p95",
            BadReason::JitterP95 => "jitter_p95",
            BadReason::LatencyAndJitter => "latency_and_jitter",
        }
    }

    /// Parse the stored form; unknown strings are None.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fine" => Some(BadReason::Fine),
            "latency_p95" => Some(BadReason::LatencyP95),
            "jitter_p95" => Some(BadReason::JitterP95),
            "latency_and_jitter" => Some(BadReason::LatencyAndJitter),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadMomentFlag {
    pub bucket: BucketRef,
    pub is_bad: bool,
    /// Breached thresholds. May be non-`Fine` while `is_bad` is false under `combine = "all"`.
    pub reason: BadReason,
}

/// Metrics and their verdict, as stored in the derived cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredBucket {
    pub metrics: BucketMetrics,
    pub flag: BadMomentFlag,
}
