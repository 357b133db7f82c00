// Raw latency observation, the interface it was measured on, and half-open time ranges.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ParseSourceError, SampleError};

/// Measured interface: the local gateway (LAN) or an upstream host (WAN).
/// Serializes to lowercase JSON ("lan", "wan").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Lan,
    Wan,
}

impl Source {
    pub const ALL: [Source; 2] = [Source::Lan, Source::Wan];

    pub fn as_str(self) -> &'static str {
        match self {
            Source::Lan => "lan",
            Source::Wan => "wan",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Source::Lan => 0,
            Source::Wan => 1,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = ParseSourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lan" => Ok(Source::Lan),
            "wan" => Ok(Source::Wan),
            _ => Err(ParseSourceError(s.to_string())),
        }
    }
}

/// One latency measurement. Immutable once appended to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub timestamp_ms: i64,
    pub source: Source,
    pub latency_ms: f64,
    pub phase: String,
}

impl Sample {
    pub fn new(timestamp_ms: i64, source: Source, latency_ms: f64, phase: impl Into<String>) -> Self {
        Self {
            timestamp_ms,
            source,
            latency_ms,
            phase: phase.into(),
        }
    }

    /// Field-level checks. Ordering against earlier samples is the store's job.
    pub fn validate(&self) -> Result<(), SampleError> {
        if !self.latency_ms.is_finite() || self.latency_ms < 0.0 {
            return Err(SampleError::InvalidLatency(self.latency_ms));
        }
        if self.phase.trim().is_empty() {
            return Err(SampleError::EmptyPhase);
        }
        if DateTime::from_timestamp_millis(self.timestamp_ms).is_none() {
            return Err(SampleError::TimestampOutOfRange(self.timestamp_ms));
        }
        Ok(())
    }
}

/// Half-open interval `[start_ms, end_ms)` in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl TimeRange {
    /// Everything representable.
    pub const ALL: TimeRange = TimeRange {
        start_ms: i64::MIN,
        end_ms: i64::MAX,
    };

    /// Returns None when `end_ms < start_ms`.
    pub fn new(start_ms: i64, end_ms: i64) -> Option<Self> {
        (start_ms <= end_ms).then_some(Self { start_ms, end_ms })
    }

    pub fn contains(&self, timestamp_ms: i64) -> bool {
        self.start_ms <= timestamp_ms && timestamp_ms < self.end_ms
    }

    pub fn duration_ms(&self) -> i64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    pub fn hours(&self) -> f64 {
        self.duration_ms() as f64 / 3_600_000.0
    }
}
