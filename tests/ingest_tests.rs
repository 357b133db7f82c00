// Ingest, phase and export tests

mod common;

use common::{scored, sample};
use netbakeoff::error::StoreError;
use netbakeoff::export::{EXPORT_COLUMNS, export_window, sanitize_field, write_csv_atomic};
use netbakeoff::ingest::ingest_lines;
use netbakeoff::metrics_cache::MetricsCache;
use netbakeoff::models::{Source, TimeRange};
use netbakeoff::phase::{UNKNOWN_PHASE, read_phase};
use netbakeoff::sample_store::SampleStore;
use tempfile::TempDir;

const HOUR_MS: i64 = 3_600_000;

#[test]
fn ingest_accepts_good_records_and_reports_bad_ones() {
    let input = concat!(
        "{\"ts_ms\":1000,\"source\":\"wan\",\"latency_ms\":20.5}\n",
        "{\"ts\":\"1970-01-01T00:00:02.000Z\",\"source\":\"lan\",\"latency_ms\":1.2}\n",
        "\n",
        "{\"ts_ms\":3000,\"source\":\"wan\",\"latency_ms\":-5}\n",
        "not json\n",
        "{\"source\":\"wan\",\"latency_ms\":1}\n",
        "{\"ts_ms\":500,\"source\":\"wan\",\"latency_ms\":1}\n",
    );
    let store = SampleStore::in_memory();
    let report = ingest_lines(input.as_bytes(), "fiber", &store).unwrap();

    assert_eq!(report.accepted, 2);
    let lines: Vec<usize> = report.rejected.iter().map(|r| r.line).collect();
    assert_eq!(lines, vec![4, 5, 6, 7]);

    let lan: Vec<_> = store.query(Source::Lan, TimeRange::ALL).iter().collect();
    assert_eq!(lan.len(), 1);
    assert_eq!(lan[0].timestamp_ms, 2000);
    assert_eq!(lan[0].phase, "fiber");
    assert_eq!(store.len(Source::Wan), 1);
}

#[test]
fn ingest_stamps_every_sample_with_one_phase() {
    let input = "{\"ts_ms\":1,\"source\":\"wan\",\"latency_ms\":1}\n{\"ts_ms\":2,\"source\":\"lan\",\"latency_ms\":1}\n";
    let store = SampleStore::in_memory();
    ingest_lines(input.as_bytes(), "isp-b", &store).unwrap();
    for source in Source::ALL {
        assert!(
            store
                .query(source, TimeRange::ALL)
                .iter()
                .all(|s| s.phase == "isp-b")
        );
    }
}

#[test]
fn ingest_refuses_when_another_producer_is_active() {
    let store = SampleStore::in_memory();
    let _held = store.producer(Source::Wan).unwrap();
    let err = ingest_lines("".as_bytes(), "fiber", &store).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StoreError>(),
        Some(StoreError::ProducerConflict(Source::Wan))
    ));
}

#[test]
fn ingest_releases_producers_when_done() {
    let store = SampleStore::in_memory();
    ingest_lines("".as_bytes(), "fiber", &store).unwrap();
    store.append(sample(Source::Wan, 0, 1.0, "fiber")).unwrap();
}

#[test]
fn phase_prefers_env_then_file_then_unknown() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("phase.txt");
    std::fs::write(&file, "fiber\n").unwrap();

    assert_eq!(read_phase(Some("  isp-a "), &file), "isp-a");
    assert_eq!(read_phase(Some("   "), &file), "fiber");
    assert_eq!(read_phase(None, &file), "fiber");

    let missing = dir.path().join("missing.txt");
    assert_eq!(read_phase(None, &missing), UNKNOWN_PHASE);

    std::fs::write(&file, "\n").unwrap();
    assert_eq!(read_phase(None, &file), UNKNOWN_PHASE);
}

#[test]
fn sanitize_flattens_multiline_text() {
    assert_eq!(sanitize_field("a\nb\tc"), "a | b c");
    assert_eq!(sanitize_field("  plain  "), "plain");
}

#[test]
fn csv_is_written_atomically_with_header() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("viz").join("latest.csv");
    let rows = vec![
        scored(Source::Lan, "fiber", 0, 2.0, 0.5, false),
        scored(Source::Wan, "fiber", 0, 150.0, 12.5, true),
    ];
    assert_eq!(write_csv_atomic(&path, &rows).unwrap(), 2);
    assert!(!dir.path().join("viz").join("latest.csv.tmp").exists());

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], EXPORT_COLUMNS.join(","));
    assert_eq!(
        lines[2],
        "1970-01-01T00:00:00Z,0,wan,fiber,60,75.000,150.000,12.500,75.000,300.000,true,latency_p95"
    );
}

#[tokio::test]
async fn export_window_keeps_recent_hours_only() {
    let dir = TempDir::new().unwrap();
    let cache = MetricsCache::connect(dir.path().join("derived.db").to_str().unwrap())
        .await
        .unwrap();
    cache.init().await.unwrap();
    cache
        .save(&[
            scored(Source::Wan, "fiber", 0, 30.0, 4.0, false),
            scored(Source::Wan, "fiber", HOUR_MS, 30.0, 4.0, false),
            scored(Source::Wan, "fiber", 2 * HOUR_MS, 30.0, 4.0, false),
        ])
        .await
        .unwrap();

    let path = dir.path().join("out.csv");
    let written = export_window(&cache, &path, 1, 2 * HOUR_MS).await.unwrap();
    assert_eq!(written, 1);
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.lines().nth(1).unwrap().contains(",3600000,"));
}
