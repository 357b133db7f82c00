// SQLite cache of derived bucket metrics and bad-moment flags.
// The JSONL sample files stay the source of truth; this cache is dropped and
// rebuilt whenever the derived fingerprint (thresholds + bucket width) changes.

mod schema;

use std::path::Path;
use std::str::FromStr;

use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{info, instrument};

use crate::models::{
    BadMomentFlag, BadReason, BucketMetrics, BucketRef, ScoredBucket, Source, TimeRange,
};

pub struct MetricsCache {
    pool: SqlitePool,
}

impl MetricsCache {
    pub async fn connect(path: &str) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new().connect_with(opts).await?;
        Ok(Self { pool })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        schema::init_tables(&self.pool).await
    }

    /// Records `fingerprint`; if a different one was stored, every cached row
    /// is deleted first. Returns true when rows were invalidated.
    #[instrument(skip(self, fingerprint), fields(repo = "cache", operation = "ensure_fingerprint"))]
    pub async fn ensure_fingerprint(&self, fingerprint: &str) -> anyhow::Result<bool> {
        let mut tx = self.pool.begin().await?;
        let stored: Option<String> =
            sqlx::query_scalar("SELECT value FROM cache_meta WHERE key = $1")
                .bind(schema::FINGERPRINT_KEY)
                .fetch_optional(&mut *tx)
                .await?;

        if stored.as_deref() == Some(fingerprint) {
            tx.commit().await?;
            return Ok(false);
        }

        let removed = sqlx::query("DELETE FROM bucket_metrics")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("INSERT OR REPLACE INTO cache_meta (key, value) VALUES ($1, $2)")
            .bind(schema::FINGERPRINT_KEY)
            .bind(fingerprint)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        let invalidated = stored.is_some();
        if invalidated {
            info!(removed_rows = removed, "derived configuration changed; cache invalidated");
        }
        Ok(invalidated)
    }

    #[instrument(skip(self, rows), fields(repo = "cache", operation = "save", rows_count = rows.len()))]
    pub async fn save(&self, rows: &[ScoredBucket]) -> anyhow::Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for row in rows {
            let m = &row.metrics;
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO bucket_metrics
                (source, phase, start_ms, duration_ms, sample_count,
                 median_latency_ms, p95_latency_ms, p95_jitter_ms, mean_latency_ms, max_latency_ms,
                 is_bad, reason)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                "#,
            )
            .bind(m.bucket.source.as_str())
            .bind(&m.bucket.phase)
            .bind(m.bucket.start_ms)
            .bind(m.bucket.duration_ms)
            .bind(m.sample_count as i64)
            .bind(m.median_latency_ms)
            .bind(m.p95_latency_ms)
            .bind(m.p95_jitter_ms)
            .bind(m.mean_latency_ms)
            .bind(m.max_latency_ms)
            .bind(row.flag.is_bad)
            .bind(row.flag.reason.as_str())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Rows whose bucket start lies in `range`, optionally filtered by source
    /// and phase. Order: start, source, phase.
    #[instrument(skip(self), fields(repo = "cache", operation = "get_range"))]
    pub async fn get_range(
        &self,
        range: TimeRange,
        source: Option<Source>,
        phase: Option<&str>,
    ) -> anyhow::Result<Vec<ScoredBucket>> {
        let rows = sqlx::query(
            "SELECT source, phase, start_ms, duration_ms, sample_count,
                    median_latency_ms, p95_latency_ms, p95_jitter_ms, mean_latency_ms, max_latency_ms,
                    is_bad, reason
             FROM bucket_metrics
             WHERE start_ms >= $1 AND start_ms < $2
               AND ($3 IS NULL OR source = $3)
               AND ($4 IS NULL OR phase = $4)
             ORDER BY start_ms ASC, source ASC, phase ASC",
        )
        .bind(range.start_ms)
        .bind(range.end_ms)
        .bind(source.map(Source::as_str))
        .bind(phase)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(Self::parse_row(&row)?);
        }
        Ok(out)
    }

    /// End of the latest cached window for `source`; the next cycle resumes here.
    pub async fn last_sealed_end(&self, source: Source) -> anyhow::Result<Option<i64>> {
        let end = sqlx::query_scalar::<_, Option<i64>>(
            "SELECT MAX(start_ms + duration_ms) FROM bucket_metrics WHERE source = $1",
        )
        .bind(source.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(end)
    }

    pub async fn count(&self) -> anyhow::Result<i64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM bucket_metrics")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    /// Drop every cached row (the fingerprint is kept).
    #[instrument(skip(self), fields(repo = "cache", operation = "clear"))]
    pub async fn clear(&self) -> anyhow::Result<u64> {
        let r = sqlx::query("DELETE FROM bucket_metrics")
            .execute(&self.pool)
            .await?;
        Ok(r.rows_affected())
    }

    fn parse_row(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<ScoredBucket> {
        let source: String = row.try_get("source")?;
        let source = Source::from_str(&source)?;
        let reason: String = row.try_get("reason")?;
        let reason = BadReason::parse(&reason)
            .ok_or_else(|| anyhow::anyhow!("unknown cached reason {:?}", reason))?;
        let sample_count: i64 = row.try_get("sample_count")?;

        let bucket = BucketRef {
            source,
            phase: row.try_get("phase")?,
            start_ms: row.try_get("start_ms")?,
            duration_ms: row.try_get("duration_ms")?,
        };
        let metrics = BucketMetrics {
            bucket: bucket.clone(),
            sample_count: usize::try_from(sample_count)?,
            median_latency_ms: row.try_get("median_latency_ms")?,
            p95_latency_ms: row.try_get("p95_latency_ms")?,
            p95_jitter_ms: row.try_get("p95_jitter_ms")?,
            mean_latency_ms: row.try_get("mean_latency_ms")?,
            max_latency_ms: row.try_get("max_latency_ms")?,
        };
        let flag = BadMomentFlag {
            bucket,
            is_bad: row.try_get("is_bad")?,
            reason,
        };
        Ok(ScoredBucket { metrics, flag })
    }
}
