// Windowed CSV export for the dashboard: last N hours of bucket metrics and
// flags, written to a temp file and renamed into place.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::info;

use crate::metrics_cache::MetricsCache;
use crate::models::{ScoredBucket, TimeRange};

pub const EXPORT_COLUMNS: [&str; 12] = [
    "bucket_start",
    "start_ms",
    "source",
    "phase",
    "sample_count",
    "median_ms",
    "p95_ms",
    "jitter_p95_ms",
    "mean_ms",
    "max_ms",
    "is_bad",
    "reason",
];

/// Flattens free text onto one line: newlines become " | ", tabs become spaces.
pub fn sanitize_field(s: &str) -> String {
    s.lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(" | ")
        .replace('\t', " ")
        .trim()
        .to_string()
}

/// Quotes a field only when it needs it.
fn csv_field(s: &str) -> String {
    let clean = sanitize_field(s);
    if clean.contains([',', '"']) {
        format!("\"{}\"", clean.replace('"', "\"\""))
    } else {
        clean
    }
}

fn csv_row(row: &ScoredBucket) -> String {
    let m = &row.metrics;
    let bucket_start = DateTime::<Utc>::from_timestamp_millis(m.bucket.start_ms)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default();
    [
        bucket_start,
        m.bucket.start_ms.to_string(),
        m.bucket.source.to_string(),
        csv_field(&m.bucket.phase),
        m.sample_count.to_string(),
        format!("{:.3}", m.median_latency_ms),
        format!("{:.3}", m.p95_latency_ms),
        format!("{:.3}", m.p95_jitter_ms),
        format!("{:.3}", m.mean_latency_ms),
        format!("{:.3}", m.max_latency_ms),
        row.flag.is_bad.to_string(),
        row.flag.reason.as_str().to_string(),
    ]
    .join(",")
}

/// Writes `rows` as CSV to `path` atomically (via `<path>.tmp`). Returns rows written.
pub fn write_csv_atomic(path: &Path, rows: &[ScoredBucket]) -> anyhow::Result<usize> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = Path::new(&tmp_name);

    {
        let mut w = BufWriter::new(File::create(tmp)?);
        writeln!(w, "{}", EXPORT_COLUMNS.join(","))?;
        for row in rows {
            writeln!(w, "{}", csv_row(row))?;
        }
        w.flush()?;
    }
    std::fs::rename(tmp, path)?;
    Ok(rows.len())
}

/// Exports cached rows whose bucket starts within `window_hours` before `now_ms`.
pub async fn export_window(
    cache: &MetricsCache,
    path: &Path,
    window_hours: u32,
    now_ms: i64,
) -> anyhow::Result<usize> {
    let window_ms = i64::from(window_hours) * 3_600_000;
    let range = TimeRange {
        start_ms: now_ms.saturating_sub(window_ms),
        end_ms: now_ms,
    };
    let rows = cache.get_range(range, None, None).await?;
    let written = write_csv_atomic(path, &rows)?;
    info!(rows = written, path = %path.display(), window_hours, "export written");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_field_quotes_commas_and_quotes() {
        assert_eq!(csv_field("fiber"), "fiber");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
