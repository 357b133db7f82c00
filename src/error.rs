// Engine error types. Config, cache and CLI glue wrap these in anyhow.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::{BucketRef, Source};

/// Why a sample was refused at ingestion. Never coerced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SampleError {
    #[error("latency_ms must be finite and >= 0, got {0}")]
    InvalidLatency(f64),
    #[error("phase label must be non-empty")]
    EmptyPhase,
    #[error("timestamp {0} ms is outside the representable date range")]
    TimestampOutOfRange(i64),
    #[error("{lane} timestamp {timestamp_ms} is earlier than last appended {last_ms}")]
    NonMonotonic {
        lane: Source,
        last_ms: i64,
        timestamp_ms: i64,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid sample: {0}")]
    InvalidSample(#[from] SampleError),
    #[error("{0} already has an active producer")]
    ProducerConflict(Source),
    #[error("producer for {expected} was handed a {got} sample")]
    SourceMismatch { expected: Source, got: Source },
    #[error("corrupt sample record at {}:{line}: {reason}", .path.display())]
    CorruptRecord {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("sample log I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("sample log encoding: {0}")]
    Json(#[from] serde_json::Error),
}

/// Signaled for an empty bucket; callers skip the interval and carry on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no samples in {} bucket at {} ({})", .bucket.source, .bucket.start_ms, .bucket.phase)]
pub struct InsufficientSamples {
    pub bucket: BucketRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown source {0:?}, expected \"lan\" or \"wan\"")]
pub struct ParseSourceError(pub String);
