// Partition per-source sample streams into epoch-aligned, fixed-width windows.
// Empty windows produce no bucket: a gap stays a gap.

use std::collections::BTreeMap;

use tracing::warn;

use crate::models::{Bucket, BucketRef, Observation, Sample, Source};

/// Start of the window containing `timestamp_ms`. Euclidean floor, so the
/// result depends only on the timestamp and the width.
pub fn window_start(timestamp_ms: i64, duration_ms: i64) -> i64 {
    timestamp_ms.div_euclid(duration_ms) * duration_ms
}

/// Streaming bucketizer. Input must be in timestamp order per source (the
/// sample store guarantees this). A phase returning within one window seals
/// a second piece under the same key; `bucketize` joins those.
#[derive(Debug)]
pub struct Bucketizer {
    duration_ms: i64,
    open: BTreeMap<Source, Bucket>,
}

impl Bucketizer {
    /// `duration_ms` below 1 is treated as 1.
    pub fn new(duration_ms: i64) -> Self {
        Self {
            duration_ms: duration_ms.max(1),
            open: BTreeMap::new(),
        }
    }

    pub fn duration_ms(&self) -> i64 {
        self.duration_ms
    }

    /// Adds a sample; returns the bucket it sealed, if any. A sample past the
    /// open window's end, or carrying a different phase, seals the open bucket.
    pub fn push(&mut self, sample: &Sample) -> Option<Bucket> {
        let start = window_start(sample.timestamp_ms, self.duration_ms);
        let mut sealed = None;

        if let Some(open) = self.open.get(&sample.source) {
            if sample.timestamp_ms < open.key.start_ms {
                warn!(
                    source = %sample.source,
                    ts = sample.timestamp_ms,
                    window_start = open.key.start_ms,
                    "sample precedes open bucket; dropped"
                );
                return None;
            }
            if sample.timestamp_ms >= open.key.end_ms() || sample.phase != open.key.phase {
                sealed = self.open.remove(&sample.source);
            }
        }

        let bucket = self.open.entry(sample.source).or_insert_with(|| {
            Bucket::new(BucketRef {
                source: sample.source,
                phase: sample.phase.clone(),
                start_ms: start,
                duration_ms: self.duration_ms,
            })
        });
        bucket.observations.push(Observation {
            timestamp_ms: sample.timestamp_ms,
            latency_ms: sample.latency_ms,
        });
        sealed
    }

    /// Seals every open bucket whose window ends at or before `cutoff_ms`.
    pub fn seal_as_of(&mut self, cutoff_ms: i64) -> Vec<Bucket> {
        let due: Vec<Source> = self
            .open
            .iter()
            .filter(|(_, b)| b.key.end_ms() <= cutoff_ms)
            .map(|(s, _)| *s)
            .collect();
        due.into_iter()
            .filter_map(|s| self.open.remove(&s))
            .collect()
    }

    /// Seals everything still open, regardless of time.
    pub fn finish(self) -> Vec<Bucket> {
        self.open.into_values().collect()
    }
}

/// Batch form: buckets sealed by the data itself, plus (with `as_of_ms`) the
/// trailing buckets whose windows closed by the cutoff. Windows still open
/// are left out. Ordered by source, then start, then phase; keys are unique.
pub fn bucketize<I>(samples: I, duration_ms: i64, as_of_ms: Option<i64>) -> Vec<Bucket>
where
    I: IntoIterator<Item = Sample>,
{
    let mut bucketizer = Bucketizer::new(duration_ms);
    let mut out: Vec<Bucket> = samples
        .into_iter()
        .filter_map(|s| bucketizer.push(&s))
        .collect();
    if let Some(cutoff) = as_of_ms {
        out.extend(bucketizer.seal_as_of(cutoff));
    }
    out.sort_by(|a, b| {
        (a.key.source, a.key.start_ms, &a.key.phase).cmp(&(
            b.key.source,
            b.key.start_ms,
            &b.key.phase,
        ))
    });
    merge_same_key(out)
}

/// A phase that returns within one window (A, B, A) seals two pieces with the
/// same key. Joins them so each key maps to exactly one bucket. Input must be
/// sorted by key; the sort is stable, so observations stay in arrival order.
fn merge_same_key(sorted: Vec<Bucket>) -> Vec<Bucket> {
    let mut merged: Vec<Bucket> = Vec::with_capacity(sorted.len());
    for bucket in sorted {
        match merged.last_mut() {
            Some(last) if last.key == bucket.key => {
                last.observations.extend(bucket.observations);
            }
            _ => merged.push(bucket),
        }
    }
    merged
}
