// Collector hand-off: JSON-lines records in, validated samples appended.
// One invocation is the single producer for both sources.

use std::io::BufRead;

use chrono::DateTime;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::StoreError;
use crate::models::{Sample, Source};
use crate::sample_store::SampleStore;

/// What the collector emits. Either `ts_ms` or an RFC 3339 `ts` is required.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorRecord {
    #[serde(default)]
    pub ts_ms: Option<i64>,
    #[serde(default)]
    pub ts: Option<String>,
    pub source: Source,
    pub latency_ms: f64,
}

impl CollectorRecord {
    pub fn timestamp_ms(&self) -> Result<i64, String> {
        if let Some(ms) = self.ts_ms {
            return Ok(ms);
        }
        let ts = self.ts.as_deref().ok_or("record has neither ts_ms nor ts")?;
        DateTime::parse_from_rfc3339(ts)
            .map(|t| t.timestamp_millis())
            .map_err(|e| format!("bad ts {:?}: {}", ts, e))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    /// 1-based input line.
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub accepted: usize,
    pub rejected: Vec<Rejection>,
}

/// Appends every record in `reader`, stamped with `phase`. Bad records are
/// reported back, not coerced; a producer conflict or I/O failure aborts.
pub fn ingest_lines<R: BufRead>(
    reader: R,
    phase: &str,
    store: &SampleStore,
) -> anyhow::Result<IngestReport> {
    let lan = store.producer(Source::Lan)?;
    let wan = store.producer(Source::Wan)?;
    let mut report = IngestReport::default();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }

        let parsed = serde_json::from_str::<CollectorRecord>(&line)
            .map_err(|e| e.to_string())
            .and_then(|r| Ok(Sample::new(r.timestamp_ms()?, r.source, r.latency_ms, phase)));
        let sample = match parsed {
            Ok(s) => s,
            Err(reason) => {
                report.rejected.push(Rejection {
                    line: line_no,
                    reason,
                });
                continue;
            }
        };

        let producer = match sample.source {
            Source::Lan => &lan,
            Source::Wan => &wan,
        };
        match producer.append(sample) {
            Ok(()) => report.accepted += 1,
            Err(StoreError::InvalidSample(e)) => report.rejected.push(Rejection {
                line: line_no,
                reason: e.to_string(),
            }),
            Err(e) => return Err(e.into()),
        }
    }

    for r in &report.rejected {
        warn!(line = r.line, reason = %r.reason, "sample rejected");
    }
    info!(
        phase,
        accepted = report.accepted,
        rejected = report.rejected.len(),
        "ingest complete"
    );
    Ok(report)
}
