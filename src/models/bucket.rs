// Fixed-width time bucket and the reference derived records carry back to it.

use serde::{Deserialize, Serialize};

use super::Source;

/// Identifies one bucket: source, phase and epoch-aligned window.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketRef {
    pub source: Source,
    pub phase: String,
    pub start_ms: i64,
    pub duration_ms: i64,
}

impl BucketRef {
    pub fn end_ms(&self) -> i64 {
        self.start_ms.saturating_add(self.duration_ms)
    }

    pub fn duration_minutes(&self) -> f64 {
        self.duration_ms as f64 / 60_000.0
    }
}

/// A single latency reading held by a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub timestamp_ms: i64,
    pub latency_ms: f64,
}

/// Samples observed within one window. Every observation satisfies
/// `start_ms <= timestamp_ms < start_ms + duration_ms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub key: BucketRef,
    pub observations: Vec<Observation>,
}

impl Bucket {
    pub fn new(key: BucketRef) -> Self {
        Self {
            key,
            observations: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}
