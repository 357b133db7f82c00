// Derived-cache schema. Rows are recomputable from the sample store at any time.

use sqlx::SqlitePool;

pub(super) const FINGERPRINT_KEY: &str = "derived_fingerprint";

/// Creates cache_meta and bucket_metrics (plus index) if not present.
pub(super) async fn init_tables(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query("CREATE TABLE IF NOT EXISTS cache_meta (key TEXT PRIMARY KEY, value TEXT NOT NULL)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bucket_metrics (
            source TEXT NOT NULL,
            phase TEXT NOT NULL,
            start_ms INTEGER NOT NULL,
            duration_ms INTEGER NOT NULL,
            sample_count INTEGER NOT NULL,
            median_latency_ms REAL NOT NULL,
            p95_latency_ms REAL NOT NULL,
            p95_jitter_ms REAL NOT NULL,
            mean_latency_ms REAL NOT NULL,
            max_latency_ms REAL NOT NULL,
            is_bad INTEGER NOT NULL,
            reason TEXT NOT NULL,
            PRIMARY KEY (source, phase, start_ms)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_bucket_metrics_start ON bucket_metrics(start_ms)")
        .execute(pool)
        .await?;

    Ok(())
}
