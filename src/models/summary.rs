// Per-phase (provider) rollups. Views recomputed from history, never stored.

use serde::{Deserialize, Serialize};

use super::{Source, TimeRange};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseSummary {
    pub phase: String,
    /// Buckets of the other source are summarized separately.
    pub source: Source,
    /// From the first bucket start to the last bucket end.
    pub range: TimeRange,
    pub bucket_count: usize,
    pub bad_bucket_count: usize,
    pub bad_moment_rate: f64,
    pub bad_minutes_per_hour: f64,
    /// Total bucket-hours of data behind this summary.
    pub observed_hours: f64,
    /// Nearest-rank p95 over the per-bucket p95 latencies.
    pub p95_latency_ms: f64,
    /// Nearest-rank p95 over the per-bucket jitter p95s.
    pub p95_jitter_ms: f64,
    /// Sample-weighted mean latency.
    pub mean_latency_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseRanking {
    /// 1-based; 1 is best.
    pub rank: usize,
    /// Composite score, lower is better.
    pub score: f64,
    pub summary: PhaseSummary,
}
