// Append-only sample store. One lane per source holds samples in timestamp order;
// an optional day-file log under data_dir is the durable ground truth.

mod record;

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, info, instrument};

use crate::error::{SampleError, StoreError};
use crate::models::{Sample, Source, TimeRange};

#[derive(Default)]
struct Lane {
    samples: RwLock<Vec<Sample>>,
    producer_active: AtomicBool,
}

impl Lane {
    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Sample>> {
        self.samples.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Sample>> {
        self.samples.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validates against the lane's last timestamp; equal timestamps are allowed.
    fn check_order(&self, sample: &Sample) -> Result<(), SampleError> {
        if let Some(last) = self.read().last()
            && sample.timestamp_ms < last.timestamp_ms
        {
            return Err(SampleError::NonMonotonic {
                lane: sample.source,
                last_ms: last.timestamp_ms,
                timestamp_ms: sample.timestamp_ms,
            });
        }
        Ok(())
    }
}

pub struct SampleStore {
    lanes: [Arc<Lane>; 2],
    log: Option<Mutex<record::DayFileLog>>,
    data_dir: Option<PathBuf>,
}

impl SampleStore {
    /// Store without a durable log (tests, one-off recomputation).
    pub fn in_memory() -> Self {
        Self {
            lanes: Default::default(),
            log: None,
            data_dir: None,
        }
    }

    /// Opens `data_dir`, creating it if missing, and replays every day file
    /// through the same validation `append` applies.
    #[instrument(fields(store = "samples", operation = "open"))]
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(data_dir)?;
        let mut store = Self::in_memory();

        let files = record::list_day_files(data_dir)?;
        let mut replayed = 0usize;
        for path in &files {
            for (line, sample) in record::read_day_file(path)? {
                let lane = store.lane(sample.source);
                let checked = sample
                    .validate()
                    .and_then(|()| lane.check_order(&sample));
                if let Err(e) = checked {
                    return Err(StoreError::CorruptRecord {
                        path: path.clone(),
                        line,
                        reason: e.to_string(),
                    });
                }
                lane.write().push(sample);
                replayed += 1;
            }
        }
        info!(files = files.len(), samples = replayed, dir = %data_dir.display(), "sample store opened");

        store.log = Some(Mutex::new(record::DayFileLog::new(data_dir.to_path_buf())));
        store.data_dir = Some(data_dir.to_path_buf());
        Ok(store)
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    fn lane(&self, source: Source) -> &Arc<Lane> {
        &self.lanes[source.index()]
    }

    /// Claims the single-writer slot for `source`. A second live claim is a
    /// configuration error, not something to merge. On a durable store the
    /// claim is also an exclusive lock file in `data_dir`, so a producer in
    /// another process is refused too; once held, samples that process
    /// appended are loaded before anything new is accepted.
    pub fn producer(&self, source: Source) -> Result<Producer<'_>, StoreError> {
        let lane = self.lane(source);
        lane.producer_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| StoreError::ProducerConflict(source))?;
        let mut producer = Producer {
            store: self,
            source,
            file_lock: None,
        };

        if let Some(dir) = &self.data_dir {
            producer.file_lock = Some(lock_producer_file(dir, source)?);
            self.sync_lane(dir, source)?;
        }
        Ok(producer)
    }

    /// Loads samples of `source` that reached the day files after this store
    /// read them. Only files from the day of the lane's last sample onwards
    /// can hold new ones.
    fn sync_lane(&self, dir: &Path, source: Source) -> Result<(), StoreError> {
        let lane = self.lane(source);
        let (from_day, known) = {
            let samples = lane.read();
            match samples.last() {
                Some(last) => {
                    let start = record::day_start(last.timestamp_ms);
                    let before = samples.partition_point(|s| s.timestamp_ms < start);
                    (Some(record::day_key(start)), samples.len() - before)
                }
                None => (None, 0),
            }
        };

        let on_disk = record::read_source_since(dir, source, from_day.as_deref())?;
        let mut loaded = 0usize;
        for (path, line, sample) in on_disk.into_iter().skip(known) {
            let checked = sample
                .validate()
                .and_then(|()| lane.check_order(&sample));
            if let Err(e) = checked {
                return Err(StoreError::CorruptRecord {
                    path,
                    line,
                    reason: e.to_string(),
                });
            }
            lane.write().push(sample);
            loaded += 1;
        }
        if loaded > 0 {
            info!(source = %source, samples = loaded, "loaded samples appended by another producer");
        }
        Ok(())
    }

    /// Appends one sample, holding the source's producer slot for the call.
    pub fn append(&self, sample: Sample) -> Result<(), StoreError> {
        self.producer(sample.source)?.append(sample)
    }

    fn append_claimed(&self, sample: Sample) -> Result<(), StoreError> {
        sample.validate()?;
        let lane = self.lane(sample.source);
        lane.check_order(&sample)?;
        if let Some(log) = &self.log {
            log.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .append(&sample)?;
        }
        debug!(source = %sample.source, ts = sample.timestamp_ms, latency_ms = sample.latency_ms, "sample appended");
        lane.write().push(sample);
        Ok(())
    }

    /// Samples for `source` with timestamps in `range`, in timestamp order.
    /// The end position is fixed now: appends made later are not visited.
    pub fn query(&self, source: Source, range: TimeRange) -> SampleQuery {
        let lane = self.lane(source).clone();
        let (first, end) = {
            let samples = lane.read();
            (
                samples.partition_point(|s| s.timestamp_ms < range.start_ms),
                samples.partition_point(|s| s.timestamp_ms < range.end_ms),
            )
        };
        SampleQuery {
            lane,
            first,
            end: end.max(first),
        }
    }

    pub fn len(&self, source: Source) -> usize {
        self.lane(source).read().len()
    }

    pub fn is_empty(&self) -> bool {
        Source::ALL.iter().all(|s| self.len(*s) == 0)
    }

    /// First and last timestamps recorded for `source`.
    pub fn bounds(&self, source: Source) -> Option<(i64, i64)> {
        let samples = self.lane(source).read();
        Some((samples.first()?.timestamp_ms, samples.last()?.timestamp_ms))
    }
}

/// Takes the per-source lock file without blocking. Contention means another
/// producer holds it.
fn lock_producer_file(dir: &Path, source: Source) -> Result<fd_lock::RwLock<File>, StoreError> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(record::producer_lock_path(dir, source))?;
    let mut lock = fd_lock::RwLock::new(file);
    match lock.try_write() {
        // The lock stays held for as long as the file handle is open, which is
        // the producer's lifetime; dropping the guard would unlock it now.
        Ok(guard) => std::mem::forget(guard),
        Err(e) => {
            debug!(source = %source, error = %e, "producer lock busy");
            return Err(StoreError::ProducerConflict(source));
        }
    }
    Ok(lock)
}

/// Exclusive append handle for one source. Dropping it releases the slot.
pub struct Producer<'a> {
    store: &'a SampleStore,
    source: Source,
    file_lock: Option<fd_lock::RwLock<File>>,
}

impl Producer<'_> {
    pub fn source(&self) -> Source {
        self.source
    }

    pub fn append(&self, sample: Sample) -> Result<(), StoreError> {
        if sample.source != self.source {
            return Err(StoreError::SourceMismatch {
                expected: self.source,
                got: sample.source,
            });
        }
        self.store.append_claimed(sample)
    }
}

impl Drop for Producer<'_> {
    fn drop(&mut self) {
        // Unlock before the slot reopens, or a quick reclaim sees the old lock
        self.file_lock.take();
        self.store
            .lane(self.source)
            .producer_active
            .store(false, Ordering::Release);
    }
}

/// Restartable view over a slice of one lane. Each `iter()` starts over.
#[derive(Clone)]
pub struct SampleQuery {
    lane: Arc<Lane>,
    first: usize,
    end: usize,
}

impl SampleQuery {
    pub fn iter(&self) -> SampleIter {
        SampleIter {
            lane: self.lane.clone(),
            next: self.first,
            end: self.end,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.first
    }

    pub fn is_empty(&self) -> bool {
        self.first == self.end
    }
}

impl IntoIterator for &SampleQuery {
    type Item = Sample;
    type IntoIter = SampleIter;

    fn into_iter(self) -> SampleIter {
        self.iter()
    }
}

impl IntoIterator for SampleQuery {
    type Item = Sample;
    type IntoIter = SampleIter;

    fn into_iter(self) -> SampleIter {
        self.iter()
    }
}

/// Lazy cursor: reads one sample per step under a short read lock.
pub struct SampleIter {
    lane: Arc<Lane>,
    next: usize,
    end: usize,
}

impl Iterator for SampleIter {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        if self.next >= self.end {
            return None;
        }
        let sample = self.lane.read().get(self.next).cloned();
        self.next += 1;
        sample
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SampleIter {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_key_is_utc_date() {
        // 2026-02-11T23:59:59.999Z and one millisecond later
        assert_eq!(record::day_key(1_770_854_399_999), "20260211");
        assert_eq!(record::day_key(1_770_854_400_000), "20260212");
    }

    #[test]
    fn query_end_is_fixed_at_creation() {
        let store = SampleStore::in_memory();
        store.append(Sample::new(0, Source::Wan, 10.0, "a")).unwrap();
        let q = store.query(Source::Wan, TimeRange::ALL);
        store.append(Sample::new(1, Source::Wan, 11.0, "a")).unwrap();
        assert_eq!(q.iter().count(), 1);
        assert_eq!(store.query(Source::Wan, TimeRange::ALL).len(), 2);
    }
}
