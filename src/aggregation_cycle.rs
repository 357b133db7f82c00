// One bounded aggregation pass per invocation: bucket newly completed windows
// for each source, aggregate, classify and store in the derived cache.
// The scheduler calls this; nothing here loops or sleeps.

use tracing::{debug, info, instrument};

use crate::aggregator::aggregate_all;
use crate::bucketizer::{bucketize, window_start};
use crate::classifier::{ClassifierConfig, classify_all};
use crate::config::AppConfig;
use crate::metrics_cache::MetricsCache;
use crate::models::{ScoredBucket, Source, TimeRange};
use crate::sample_store::SampleStore;

#[derive(Debug, Clone)]
pub struct CycleConfig {
    pub bucket_duration_ms: i64,
    pub classifier: ClassifierConfig,
    pub fingerprint: String,
    /// Also seal windows ending at or before this instant. The caller promises
    /// no sample older than the cutoff will be appended afterwards.
    pub as_of_ms: Option<i64>,
}

impl CycleConfig {
    pub fn from_app(config: &AppConfig, as_of_ms: Option<i64>) -> anyhow::Result<Self> {
        Ok(Self {
            bucket_duration_ms: config.bucket_duration_ms(),
            classifier: config.thresholds.clone(),
            fingerprint: config.derived_fingerprint()?,
            as_of_ms,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// True when a configuration change forced a recompute from scratch.
    pub rebuilt: bool,
    pub buckets_saved: usize,
    pub bad_buckets: usize,
    pub insufficient: usize,
}

/// Runs one cycle over every source.
#[instrument(skip_all, fields(as_of_ms = ?config.as_of_ms))]
pub async fn run_one_cycle(
    store: &SampleStore,
    cache: &MetricsCache,
    config: &CycleConfig,
) -> anyhow::Result<CycleReport> {
    let mut report = CycleReport {
        rebuilt: cache.ensure_fingerprint(&config.fingerprint).await?,
        ..Default::default()
    };

    for source in Source::ALL {
        let rows = sealed_rows(store, cache, config, source, &mut report).await?;
        if rows.is_empty() {
            continue;
        }
        let bad = rows.iter().filter(|r| r.flag.is_bad).count();
        cache.save(&rows).await?;
        report.buckets_saved += rows.len();
        report.bad_buckets += bad;
        info!(source = %source, buckets = rows.len(), bad_buckets = bad, "aggregated sealed buckets");
    }

    Ok(report)
}

/// Completed windows for `source` that the cache has not seen yet.
async fn sealed_rows(
    store: &SampleStore,
    cache: &MetricsCache,
    config: &CycleConfig,
    source: Source,
    report: &mut CycleReport,
) -> anyhow::Result<Vec<ScoredBucket>> {
    let Some((_, last_ts)) = store.bounds(source) else {
        return Ok(Vec::new());
    };
    let resume_from = cache.last_sealed_end(source).await?.unwrap_or(i64::MIN);

    // A window is complete once a later window has data or the cutoff passes it.
    // Phase changes may split a window, so the newest window always waits.
    let seal_point = window_start(last_ts, config.bucket_duration_ms)
        .max(config.as_of_ms.unwrap_or(i64::MIN));

    let samples = store.query(
        source,
        TimeRange {
            start_ms: resume_from,
            end_ms: i64::MAX,
        },
    );
    let buckets: Vec<_> = bucketize(&samples, config.bucket_duration_ms, config.as_of_ms)
        .into_iter()
        .filter(|b| b.key.end_ms() <= seal_point)
        .collect();

    let (metrics, skipped) = aggregate_all(&buckets);
    for s in &skipped {
        debug!(error = %s, "skipping bucket");
    }
    report.insufficient += skipped.len();

    let flags = classify_all(&metrics, &config.classifier);
    Ok(metrics
        .into_iter()
        .zip(flags)
        .map(|(metrics, flag)| ScoredBucket { metrics, flag })
        .collect())
}
