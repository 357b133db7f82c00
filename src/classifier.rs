// Bad-moment classification against per-source thresholds, and the rate
// rollups computed from stored flags.

use serde::{Deserialize, Serialize};

use crate::models::{BadMomentFlag, BadReason, BucketMetrics, Source, TimeRange};

/// How breaches combine into a verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combine {
    /// Bad if either threshold is breached.
    #[default]
    Any,
    /// Bad only if both are.
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub latency_p95_threshold_ms: f64,
    pub jitter_p95_threshold_ms: f64,
    #[serde(default)]
    pub combine: Combine,
}

/// Thresholds per source; both must be configured (`[thresholds.lan]`, `[thresholds.wan]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub lan: Thresholds,
    pub wan: Thresholds,
}

impl ClassifierConfig {
    pub fn for_source(&self, source: Source) -> &Thresholds {
        match source {
            Source::Lan => &self.lan,
            Source::Wan => &self.wan,
        }
    }
}

/// A metric breaches when strictly above its threshold.
pub fn classify(metrics: &BucketMetrics, thresholds: &Thresholds) -> BadMomentFlag {
    let latency = metrics.p95_latency_ms > thresholds.latency_p95_threshold_ms;
    let jitter = metrics.p95_jitter_ms > thresholds.jitter_p95_threshold_ms;

    let reason = match (latency, jitter) {
        (true, true) => BadReason::LatencyAndJitter,
        (true, false) => BadReason::LatencyP95,
        (false, true) => BadReason::JitterP95,
        (false, false) => BadReason::Fine,
    };
    let is_bad = match thresholds.combine {
        Combine::Any => latency || jitter,
        Combine::All => latency && jitter,
    };

    BadMomentFlag {
        bucket: metrics.bucket.clone(),
        is_bad,
        reason,
    }
}

/// One flag per metrics record, using the thresholds of each record's source.
pub fn classify_all(metrics: &[BucketMetrics], config: &ClassifierConfig) -> Vec<BadMomentFlag> {
    metrics
        .iter()
        .map(|m| classify(m, config.for_source(m.bucket.source)))
        .collect()
}

fn in_scope<'a>(
    flags: &'a [BadMomentFlag],
    phase: &'a str,
    range: TimeRange,
) -> impl Iterator<Item = &'a BadMomentFlag> {
    flags
        .iter()
        .filter(move |f| f.bucket.phase == phase && range.contains(f.bucket.start_ms))
}

/// Share of bad buckets for `phase` whose start lies in `range`. 0 with no buckets.
pub fn bad_moment_rate(flags: &[BadMomentFlag], phase: &str, range: TimeRange) -> f64 {
    let (bad, total) = in_scope(flags, phase, range).fold((0usize, 0usize), |(bad, total), f| {
        (bad + usize::from(f.is_bad), total + 1)
    });
    if total == 0 {
        return 0.0;
    }
    bad as f64 / total as f64
}

/// Minutes covered by bad buckets, per hour of `range`. 0 for an empty range.
pub fn bad_minutes_per_hour(flags: &[BadMomentFlag], phase: &str, range: TimeRange) -> f64 {
    let hours = range.hours();
    if hours <= 0.0 {
        return 0.0;
    }
    let bad_minutes: f64 = in_scope(flags, phase, range)
        .filter(|f| f.is_bad)
        .map(|f| f.bucket.duration_minutes())
        .sum();
    bad_minutes / hours
}
