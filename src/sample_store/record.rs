// On-disk sample log: one JSON object per line, one file per UTC day.
// File name: samples_YYYYMMDD.jsonl. Lines are human-readable and append-only.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::StoreError;
use crate::models::{Sample, Source};

pub(super) const FILE_PREFIX: &str = "samples_";
pub(super) const FILE_SUFFIX: &str = ".jsonl";
const MS_PER_DAY: i64 = 86_400_000;

/// One persisted row. `ts` is for people reading the file; `ts_ms` is authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct SampleRecord {
    pub ts: String,
    pub ts_ms: i64,
    pub source: Source,
    pub latency_ms: f64,
    pub phase: String,
}

impl SampleRecord {
    pub fn from_sample(sample: &Sample) -> Self {
        Self {
            ts: format_ts(sample.timestamp_ms),
            ts_ms: sample.timestamp_ms,
            source: sample.source,
            latency_ms: sample.latency_ms,
            phase: sample.phase.clone(),
        }
    }

    pub fn into_sample(self) -> Sample {
        Sample::new(self.ts_ms, self.source, self.latency_ms, self.phase)
    }
}

fn format_ts(timestamp_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

/// Day key (YYYYMMDD, UTC) for a sample timestamp.
pub(super) fn day_key(timestamp_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
        .map(|t| t.format("%Y%m%d").to_string())
        .unwrap_or_else(|| "invalid".into())
}

pub(super) fn day_file_path(dir: &Path, day: &str) -> PathBuf {
    dir.join(format!("{FILE_PREFIX}{day}{FILE_SUFFIX}"))
}

/// All day files in `dir`, oldest first (names sort chronologically).
pub(super) fn list_day_files(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_day_file = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(FILE_PREFIX) && n.ends_with(FILE_SUFFIX));
        if is_day_file && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Reads every record of one day file. Blank lines are skipped; anything
/// unparseable is a `CorruptRecord` naming the 1-based line, except an
/// unterminated last line, which is what a crash mid-append leaves behind.
pub(super) fn read_day_file(path: &Path) -> Result<Vec<(usize, Sample)>, StoreError> {
    let bytes = std::fs::read(path)?;
    let contents = String::from_utf8_lossy(&bytes);
    let terminated = contents.is_empty() || contents.ends_with('\n');
    let last_idx = contents.lines().count().saturating_sub(1);

    let mut out = Vec::new();
    for (idx, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<SampleRecord>(line) {
            Ok(record) => out.push((idx + 1, record.into_sample())),
            Err(e) if !terminated && idx == last_idx => {
                warn!(path = %path.display(), line = idx + 1, error = %e, "skipping torn record at end of day file");
            }
            Err(e) => {
                return Err(StoreError::CorruptRecord {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    reason: e.to_string(),
                });
            }
        }
    }
    Ok(out)
}

/// UTC midnight at or before `timestamp_ms`.
pub(super) fn day_start(timestamp_ms: i64) -> i64 {
    timestamp_ms.div_euclid(MS_PER_DAY) * MS_PER_DAY
}

/// Records of `source` from the day files dated `from_day` (YYYYMMDD) or later,
/// in file then line order. Every file when `from_day` is None.
pub(super) fn read_source_since(
    dir: &Path,
    source: Source,
    from_day: Option<&str>,
) -> Result<Vec<(PathBuf, usize, Sample)>, StoreError> {
    let mut out = Vec::new();
    for path in list_day_files(dir)? {
        let day = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix(FILE_PREFIX))
            .and_then(|n| n.strip_suffix(FILE_SUFFIX))
            .unwrap_or_default();
        if from_day.is_some_and(|from| day < from) {
            continue;
        }
        for (line, sample) in read_day_file(&path)? {
            if sample.source == source {
                out.push((path.clone(), line, sample));
            }
        }
    }
    Ok(out)
}

/// Lock file guarding the single producer of `source` across processes.
pub(super) fn producer_lock_path(dir: &Path, source: Source) -> PathBuf {
    dir.join(format!(".{source}.producer.lock"))
}

/// Opens a day file for appending. An unterminated tail left by a crash is
/// cut back to the last complete line first, so new records start clean.
fn open_for_append(path: &Path) -> Result<File, StoreError> {
    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)?;
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(file);
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    if last[0] != b'\n' {
        let bytes = std::fs::read(path)?;
        let keep = bytes
            .iter()
            .rposition(|b| *b == b'\n')
            .map_or(0, |i| i + 1) as u64;
        file.set_len(keep)?;
        warn!(path = %path.display(), dropped_bytes = len - keep, "truncated torn record at end of day file");
    }
    Ok(file)
}

/// Appends records to the day file matching each sample's UTC date.
pub(super) struct DayFileLog {
    dir: PathBuf,
    current: Option<(String, BufWriter<File>)>,
}

impl DayFileLog {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir, current: None }
    }

    pub fn append(&mut self, sample: &Sample) -> Result<(), StoreError> {
        let day = day_key(sample.timestamp_ms);
        if self
            .current
            .as_ref()
            .is_none_or(|(open_day, _)| *open_day != day)
        {
            let file = open_for_append(&day_file_path(&self.dir, &day))?;
            self.current = Some((day, BufWriter::new(file)));
        }
        let line = serde_json::to_string(&SampleRecord::from_sample(sample))?;
        if let Some((_, writer)) = self.current.as_mut() {
            writeln!(writer, "{line}")?;
            writer.flush()?;
        }
        Ok(())
    }
}
