use serde::Deserialize;

use crate::classifier::{ClassifierConfig, Thresholds};
use crate::comparator::ComparatorWeights;
use crate::models::Source;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub cache: CacheConfig,
    pub bucketing: BucketingConfig,
    pub thresholds: ClassifierConfig,
    #[serde(default)]
    pub comparator: ComparatorConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Directory holding samples_YYYYMMDD.jsonl day files.
    pub data_dir: String,
    /// Current provider label, read once per ingest (PHASE env var wins).
    #[serde(default = "default_phase_file")]
    pub phase_file: String,
}

fn default_phase_file() -> String {
    "phase.txt".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BucketingConfig {
    pub duration_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComparatorConfig {
    #[serde(flatten)]
    pub weights: ComparatorWeights,
    /// Rank on one source only; both when unset.
    #[serde(default)]
    pub source: Option<Source>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_export_path")]
    pub path: String,
    #[serde(default = "default_window_hours")]
    pub window_hours: u32,
}

fn default_export_path() -> String {
    "viz/latest.csv".into()
}

fn default_window_hours() -> u32 {
    24
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            path: default_export_path(),
            window_hours: default_window_hours(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    8089
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        Self::load_from_path(&path)
    }

    pub fn load_from_path(path: &str) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("read config {}: {}", path, e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validation guarantees the width fits in i64 milliseconds.
    pub fn bucket_duration_ms(&self) -> i64 {
        secs_to_ms(self.bucketing.duration_secs).unwrap_or(i64::MAX)
    }

    /// Identifies everything derived rows depend on. Cached metrics built
    /// under a different fingerprint are stale.
    pub fn derived_fingerprint(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(&serde_json::json!({
            "bucketDurationMs": self.bucket_duration_ms(),
            "thresholds": self.thresholds,
        }))?)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.store.data_dir.is_empty(),
            "store.data_dir must be non-empty"
        );
        anyhow::ensure!(
            !self.store.phase_file.is_empty(),
            "store.phase_file must be non-empty"
        );
        anyhow::ensure!(!self.cache.path.is_empty(), "cache.path must be non-empty");
        anyhow::ensure!(
            self.bucketing.duration_secs > 0,
            "bucketing.duration_secs must be > 0, got {}",
            self.bucketing.duration_secs
        );
        anyhow::ensure!(
            secs_to_ms(self.bucketing.duration_secs).is_some(),
            "bucketing.duration_secs is too large to express in milliseconds, got {}",
            self.bucketing.duration_secs
        );
        validate_thresholds("thresholds.lan", &self.thresholds.lan)?;
        validate_thresholds("thresholds.wan", &self.thresholds.wan)?;

        let w = &self.comparator.weights;
        for (key, value) in [
            ("comparator.rate_weight", w.rate_weight),
            ("comparator.latency_weight", w.latency_weight),
            ("comparator.jitter_weight", w.jitter_weight),
            ("comparator.data_volume_weight", w.data_volume_weight),
        ] {
            anyhow::ensure!(
                value.is_finite() && value >= 0.0,
                "{} must be finite and >= 0, got {}",
                key,
                value
            );
        }
        anyhow::ensure!(
            w.rate_weight + w.latency_weight + w.jitter_weight + w.data_volume_weight > 0.0,
            "comparator weights must not all be zero"
        );

        anyhow::ensure!(!self.export.path.is_empty(), "export.path must be non-empty");
        anyhow::ensure!(
            self.export.window_hours > 0,
            "export.window_hours must be > 0, got {}",
            self.export.window_hours
        );
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        Ok(())
    }
}

fn secs_to_ms(secs: u64) -> Option<i64> {
    i64::try_from(secs).ok()?.checked_mul(1000)
}

fn validate_thresholds(key: &str, t: &Thresholds) -> anyhow::Result<()> {
    anyhow::ensure!(
        t.latency_p95_threshold_ms.is_finite() && t.latency_p95_threshold_ms >= 0.0,
        "{}.latency_p95_threshold_ms must be finite and >= 0, got {}",
        key,
        t.latency_p95_threshold_ms
    );
    anyhow::ensure!(
        t.jitter_p95_threshold_ms.is_finite() && t.jitter_p95_threshold_ms >= 0.0,
        "{}.jitter_p95_threshold_ms must be finite and >= 0, got {}",
        key,
        t.jitter_p95_threshold_ms
    );
    Ok(())
}
