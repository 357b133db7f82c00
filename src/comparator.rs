// Provider comparison: per-phase summaries and a weighted ranking. LAN and WAN
// are never pooled; each source gets its own summaries and its own ranking.
// "Better" depends on the decision being made, so weights are configuration.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aggregator::{P95_PERCENTILE, nearest_rank};
use crate::classifier::{bad_minutes_per_hour, bad_moment_rate};
use crate::models::{BadMomentFlag, PhaseRanking, PhaseSummary, ScoredBucket, Source, TimeRange};

/// Weights of the composite score. Each term is normalized by its maximum
/// across the compared phases; lower scores rank first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparatorWeights {
    pub rate_weight: f64,
    pub latency_weight: f64,
    pub jitter_weight: f64,
    /// Penalty for having less observed data than the best-covered phase.
    pub data_volume_weight: f64,
}

impl Default for ComparatorWeights {
    fn default() -> Self {
        Self {
            rate_weight: 1.0,
            latency_weight: 0.25,
            jitter_weight: 0.25,
            data_volume_weight: 0.0,
        }
    }
}

/// Summary for one phase as seen from one source. `history` must hold only
/// that source's buckets. None when it is empty.
pub fn summarize_phase(
    phase: &str,
    source: Source,
    history: &[&ScoredBucket],
) -> Option<PhaseSummary> {
    let start_ms = history.iter().map(|b| b.metrics.bucket.start_ms).min()?;
    let end_ms = history.iter().map(|b| b.metrics.bucket.end_ms()).max()?;
    let range = TimeRange { start_ms, end_ms };

    let flags: Vec<BadMomentFlag> = history.iter().map(|b| b.flag.clone()).collect();
    let bad_bucket_count = flags.iter().filter(|f| f.is_bad).count();

    let mut p95s: Vec<f64> = history.iter().map(|b| b.metrics.p95_latency_ms).collect();
    p95s.sort_by(f64::total_cmp);
    let mut jitters: Vec<f64> = history.iter().map(|b| b.metrics.p95_jitter_ms).collect();
    jitters.sort_by(f64::total_cmp);

    let samples: usize = history.iter().map(|b| b.metrics.sample_count).sum();
    let weighted_latency: f64 = history
        .iter()
        .map(|b| b.metrics.mean_latency_ms * b.metrics.sample_count as f64)
        .sum();
    let observed_ms: i64 = history.iter().map(|b| b.metrics.bucket.duration_ms).sum();

    Some(PhaseSummary {
        phase: phase.to_string(),
        source,
        range,
        bucket_count: history.len(),
        bad_bucket_count,
        bad_moment_rate: bad_moment_rate(&flags, phase, range),
        bad_minutes_per_hour: bad_minutes_per_hour(&flags, phase, range),
        observed_hours: observed_ms as f64 / 3_600_000.0,
        p95_latency_ms: nearest_rank(&p95s, P95_PERCENTILE).unwrap_or(0.0),
        p95_jitter_ms: nearest_rank(&jitters, P95_PERCENTILE).unwrap_or(0.0),
        mean_latency_ms: if samples == 0 {
            0.0
        } else {
            weighted_latency / samples as f64
        },
    })
}

/// Groups history by phase and source and summarizes each, ordered by phase
/// label, then source.
pub fn summarize_phases(history: &[ScoredBucket]) -> Vec<PhaseSummary> {
    let mut groups: BTreeMap<(&str, Source), Vec<&ScoredBucket>> = BTreeMap::new();
    for b in history {
        groups
            .entry((b.metrics.bucket.phase.as_str(), b.metrics.bucket.source))
            .or_default()
            .push(b);
    }
    groups
        .into_iter()
        .filter_map(|((phase, source), buckets)| summarize_phase(phase, source, &buckets))
        .collect()
}

fn normalized(value: f64, max: f64) -> f64 {
    if max > 0.0 { value / max } else { 0.0 }
}

/// Composite score for each summary, in input order. Callers pass summaries
/// of a single source.
pub fn composite_scores(summaries: &[PhaseSummary], weights: &ComparatorWeights) -> Vec<f64> {
    let max = |f: fn(&PhaseSummary) -> f64| summaries.iter().map(f).fold(0.0_f64, f64::max);
    let max_rate = max(|s| s.bad_moment_rate);
    let max_p95 = max(|s| s.p95_latency_ms);
    let max_jitter = max(|s| s.p95_jitter_ms);
    let max_hours = max(|s| s.observed_hours);

    summaries
        .iter()
        .map(|s| {
            weights.rate_weight * normalized(s.bad_moment_rate, max_rate)
                + weights.latency_weight * normalized(s.p95_latency_ms, max_p95)
                + weights.jitter_weight * normalized(s.p95_jitter_ms, max_jitter)
                + weights.data_volume_weight * (1.0 - normalized(s.observed_hours, max_hours))
        })
        .collect()
}

/// Ranks phases best-first within each source; output is grouped by source.
/// Ties: lower p95 latency, then more observed bucket-hours, then phase label.
pub fn rank_phases(summaries: Vec<PhaseSummary>, weights: &ComparatorWeights) -> Vec<PhaseRanking> {
    let mut by_source: BTreeMap<Source, Vec<PhaseSummary>> = BTreeMap::new();
    for summary in summaries {
        by_source.entry(summary.source).or_default().push(summary);
    }
    by_source
        .into_values()
        .flat_map(|group| rank_group(group, weights))
        .collect()
}

fn rank_group(summaries: Vec<PhaseSummary>, weights: &ComparatorWeights) -> Vec<PhaseRanking> {
    let scores = composite_scores(&summaries, weights);
    let mut scored: Vec<(f64, PhaseSummary)> = scores.into_iter().zip(summaries).collect();
    scored.sort_by(|(sa, a), (sb, b)| compare_ranked(*sa, a, *sb, b));

    scored
        .into_iter()
        .enumerate()
        .map(|(i, (score, summary))| PhaseRanking {
            rank: i + 1,
            score,
            summary,
        })
        .collect()
}

fn compare_ranked(sa: f64, a: &PhaseSummary, sb: f64, b: &PhaseSummary) -> Ordering {
    sa.total_cmp(&sb)
        .then(a.p95_latency_ms.total_cmp(&b.p95_latency_ms))
        .then(b.observed_hours.total_cmp(&a.observed_hours))
        .then_with(|| a.phase.cmp(&b.phase))
}
