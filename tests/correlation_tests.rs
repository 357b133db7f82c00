// Correlation tests: LAN/WAN alignment, swap symmetry, unclassifiable intervals

mod common;

use common::{MINUTE_MS, flag};
use netbakeoff::correlation::{correlate, correlation_counts};
use netbakeoff::models::{Correlation, CorrelationClass, Source};

#[test]
fn upstream_only_trouble_is_wan_degraded() {
    let lan = vec![flag(Source::Lan, "fiber", 0, false)];
    let wan = vec![flag(Source::Wan, "fiber", 0, true)];
    let out = correlate(&lan, &wan);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].start_ms, 0);
    assert_eq!(out[0].phase, "fiber");
    assert_eq!(
        out[0].result,
        Correlation::Classified {
            class: CorrelationClass::WanDegraded
        }
    );
}

#[test]
fn all_four_classes() {
    let lan = vec![
        flag(Source::Lan, "p", 0, false),
        flag(Source::Lan, "p", MINUTE_MS, true),
        flag(Source::Lan, "p", 2 * MINUTE_MS, true),
        flag(Source::Lan, "p", 3 * MINUTE_MS, false),
    ];
    let wan = vec![
        flag(Source::Wan, "p", 0, true),
        flag(Source::Wan, "p", MINUTE_MS, false),
        flag(Source::Wan, "p", 2 * MINUTE_MS, true),
        flag(Source::Wan, "p", 3 * MINUTE_MS, false),
    ];
    let classes: Vec<_> = correlate(&lan, &wan).into_iter().map(|i| i.result).collect();
    let expected: Vec<_> = [
        CorrelationClass::WanDegraded,
        CorrelationClass::LanDegraded,
        CorrelationClass::BothDegraded,
        CorrelationClass::Neither,
    ]
    .into_iter()
    .map(|class| Correlation::Classified { class })
    .collect();
    assert_eq!(classes, expected);
}

#[test]
fn swapping_roles_swaps_degraded_classes() {
    let a = vec![
        flag(Source::Lan, "p", 0, false),
        flag(Source::Lan, "p", MINUTE_MS, true),
        flag(Source::Lan, "p", 2 * MINUTE_MS, true),
        flag(Source::Lan, "p", 3 * MINUTE_MS, false),
    ];
    let b = vec![
        flag(Source::Wan, "p", 0, true),
        flag(Source::Wan, "p", MINUTE_MS, false),
        flag(Source::Wan, "p", 2 * MINUTE_MS, true),
        flag(Source::Wan, "p", 3 * MINUTE_MS, false),
    ];
    let forward = correlate(&a, &b);
    let swapped = correlate(&b, &a);
    assert_eq!(forward.len(), swapped.len());
    for (f, s) in forward.iter().zip(&swapped) {
        assert_eq!(f.start_ms, s.start_ms);
        match (f.result, s.result) {
            (Correlation::Classified { class: fc }, Correlation::Classified { class: sc }) => {
                assert_eq!(fc.swapped(), sc)
            }
            other => panic!("unexpected pair: {other:?}"),
        }
    }
}

#[test]
fn missing_side_is_unclassifiable() {
    let lan = vec![flag(Source::Lan, "p", 0, true)];
    let wan = vec![flag(Source::Wan, "p", MINUTE_MS, true)];
    let out = correlate(&lan, &wan);
    assert_eq!(out.len(), 2);
    assert_eq!(
        out[0].result,
        Correlation::Unclassifiable {
            missing: Source::Wan
        }
    );
    assert_eq!(
        out[1].result,
        Correlation::Unclassifiable {
            missing: Source::Lan
        }
    );
}

#[test]
fn phases_are_not_aligned_across() {
    // Same start, different phase: neither side has a partner
    let lan = vec![flag(Source::Lan, "cable", 0, false)];
    let wan = vec![flag(Source::Wan, "fiber", 0, false)];
    let out = correlate(&lan, &wan);
    assert_eq!(out.len(), 2);
    assert!(
        out.iter()
            .all(|i| matches!(i.result, Correlation::Unclassifiable { .. }))
    );
}

#[test]
fn counts_tally_every_interval() {
    let lan = vec![
        flag(Source::Lan, "p", 0, false),
        flag(Source::Lan, "p", MINUTE_MS, false),
        flag(Source::Lan, "p", 2 * MINUTE_MS, true),
    ];
    let wan = vec![
        flag(Source::Wan, "p", 0, true),
        flag(Source::Wan, "p", MINUTE_MS, true),
    ];
    let counts = correlation_counts(&correlate(&lan, &wan));
    assert_eq!(counts.wan_degraded, 2);
    assert_eq!(counts.lan_degraded, 0);
    assert_eq!(counts.both_degraded, 0);
    assert_eq!(counts.neither, 0);
    assert_eq!(counts.unclassifiable, 1);
}

#[test]
fn interval_serializes_with_status_tag() {
    let out = correlate(
        &[flag(Source::Lan, "p", 0, false)],
        &[flag(Source::Wan, "p", 0, true)],
    );
    let json = serde_json::to_value(&out[0]).unwrap();
    assert_eq!(json["result"]["status"], "classified");
    assert_eq!(json["result"]["class"], "WAN_DEGRADED");
}
