// Config loading and validation tests

mod common;

use common::TEST_CONFIG;
use netbakeoff::classifier::Combine;
use netbakeoff::config::AppConfig;
use netbakeoff::models::Source;

#[test]
fn test_config_loads_from_str() {
    let config = AppConfig::load_from_str(TEST_CONFIG).expect("load_from_str");
    assert_eq!(config.store.data_dir, "data");
    assert_eq!(config.store.phase_file, "phase.txt");
    assert_eq!(config.cache.path, "data/derived.db");
    assert_eq!(config.bucket_duration_ms(), 60_000);
    assert_eq!(config.thresholds.lan.latency_p95_threshold_ms, 20.0);
    assert_eq!(config.thresholds.wan.jitter_p95_threshold_ms, 30.0);
    assert_eq!(config.thresholds.wan.combine, Combine::Any);
}

#[test]
fn test_config_defaults_for_optional_sections() {
    let config = AppConfig::load_from_str(TEST_CONFIG).unwrap();
    assert_eq!(config.comparator.weights.rate_weight, 1.0);
    assert_eq!(config.comparator.weights.latency_weight, 0.25);
    assert_eq!(config.comparator.weights.jitter_weight, 0.25);
    assert_eq!(config.comparator.weights.data_volume_weight, 0.0);
    assert_eq!(config.comparator.source, None);
    assert_eq!(config.export.path, "viz/latest.csv");
    assert_eq!(config.export.window_hours, 24);
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8089);
}

#[test]
fn test_config_comparator_section() {
    let s = format!(
        "{TEST_CONFIG}\n[comparator]\ndata_volume_weight = 5.0\nsource = \"wan\"\n"
    );
    let config = AppConfig::load_from_str(&s).unwrap();
    assert_eq!(config.comparator.weights.data_volume_weight, 5.0);
    // Unset weights keep their defaults
    assert_eq!(config.comparator.weights.rate_weight, 1.0);
    assert_eq!(config.comparator.source, Some(Source::Wan));
}

#[test]
fn test_config_validation_rejects_zero_bucket_duration() {
    let bad = TEST_CONFIG.replace("duration_secs = 60", "duration_secs = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("bucketing.duration_secs"));
}

#[test]
fn test_config_validation_rejects_overflowing_bucket_duration() {
    let bad = TEST_CONFIG.replace("duration_secs = 60", "duration_secs = 9223372036854775807");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("bucketing.duration_secs"));

    // Largest width that still fits
    let max_ok = TEST_CONFIG.replace("duration_secs = 60", "duration_secs = 9223372036854775");
    let config = AppConfig::load_from_str(&max_ok).unwrap();
    assert_eq!(config.bucket_duration_ms(), 9_223_372_036_854_775_000);
}

#[test]
fn test_config_validation_rejects_negative_threshold() {
    let bad = TEST_CONFIG.replace(
        "latency_p95_threshold_ms = 100.0",
        "latency_p95_threshold_ms = -1.0",
    );
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(
        err.to_string()
            .contains("thresholds.wan.latency_p95_threshold_ms")
    );
}

#[test]
fn test_config_requires_both_sources_thresholds() {
    let without_wan = TEST_CONFIG
        .split("[thresholds.wan]")
        .next()
        .unwrap()
        .to_string();
    let err = AppConfig::load_from_str(&without_wan).unwrap_err();
    assert!(err.to_string().contains("wan"));
}

#[test]
fn test_config_rejects_unknown_combine() {
    let bad = TEST_CONFIG.replacen("combine = \"any\"", "combine = \"most\"", 1);
    assert!(AppConfig::load_from_str(&bad).is_err());

    let all = TEST_CONFIG.replacen("combine = \"any\"", "combine = \"all\"", 1);
    let config = AppConfig::load_from_str(&all).unwrap();
    assert_eq!(config.thresholds.lan.combine, Combine::All);
    assert_eq!(config.thresholds.wan.combine, Combine::Any);
}

#[test]
fn test_config_validation_rejects_bad_weights() {
    let negative = format!("{TEST_CONFIG}\n[comparator]\njitter_weight = -0.5\n");
    let err = AppConfig::load_from_str(&negative).unwrap_err();
    assert!(err.to_string().contains("comparator.jitter_weight"));

    let zeros = format!(
        "{TEST_CONFIG}\n[comparator]\nrate_weight = 0.0\nlatency_weight = 0.0\njitter_weight = 0.0\n"
    );
    let err = AppConfig::load_from_str(&zeros).unwrap_err();
    assert!(err.to_string().contains("must not all be zero"));
}

#[test]
fn test_config_validation_rejects_invalid_port() {
    let bad = format!("{TEST_CONFIG}\n[server]\nport = 0\n");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("server.port"));
}

#[test]
fn test_config_validation_rejects_zero_export_window() {
    let bad = format!("{TEST_CONFIG}\n[export]\nwindow_hours = 0\n");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("export.window_hours"));
}

#[test]
fn test_fingerprint_tracks_derived_settings_only() {
    let base = AppConfig::load_from_str(TEST_CONFIG).unwrap();
    let fp = base.derived_fingerprint().unwrap();
    assert_eq!(fp, base.derived_fingerprint().unwrap());

    let stricter = TEST_CONFIG.replace(
        "latency_p95_threshold_ms = 100.0",
        "latency_p95_threshold_ms = 80.0",
    );
    let stricter = AppConfig::load_from_str(&stricter).unwrap();
    assert_ne!(fp, stricter.derived_fingerprint().unwrap());

    let wider = TEST_CONFIG.replace("duration_secs = 60", "duration_secs = 300");
    let wider = AppConfig::load_from_str(&wider).unwrap();
    assert_ne!(fp, wider.derived_fingerprint().unwrap());

    // Ranking weights do not affect cached rows
    let reweighted = format!("{TEST_CONFIG}\n[comparator]\ndata_volume_weight = 2.0\n");
    let reweighted = AppConfig::load_from_str(&reweighted).unwrap();
    assert_eq!(fp, reweighted.derived_fingerprint().unwrap());
}

#[test]
fn test_config_load_from_path() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, TEST_CONFIG).unwrap();
    let config = AppConfig::load_from_path(&path.to_string_lossy()).unwrap();
    assert_eq!(config.bucket_duration_ms(), 60_000);

    let missing = dir.path().join("nope.toml");
    let err = AppConfig::load_from_path(&missing.to_string_lossy()).unwrap_err();
    assert!(err.to_string().contains("read config"));
}
