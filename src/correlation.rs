// Align LAN and WAN verdicts on (start, phase) to tell local from upstream trouble.
// Roles are positional: the first argument is treated as LAN, the second as WAN.

use std::collections::BTreeMap;

use crate::models::{
    BadMomentFlag, CorrelatedInterval, Correlation, CorrelationClass, CorrelationCounts, Source,
};

#[derive(Default)]
struct Pair {
    lan: Option<bool>,
    wan: Option<bool>,
}

pub fn correlate(lan: &[BadMomentFlag], wan: &[BadMomentFlag]) -> Vec<CorrelatedInterval> {
    let mut aligned: BTreeMap<(i64, &str), Pair> = BTreeMap::new();
    for f in lan {
        let slot = &mut aligned
            .entry((f.bucket.start_ms, f.bucket.phase.as_str()))
            .or_default()
            .lan;
        *slot = Some(slot.unwrap_or(false) || f.is_bad);
    }
    for f in wan {
        let slot = &mut aligned
            .entry((f.bucket.start_ms, f.bucket.phase.as_str()))
            .or_default()
            .wan;
        *slot = Some(slot.unwrap_or(false) || f.is_bad);
    }

    aligned
        .into_iter()
        .map(|((start_ms, phase), pair)| CorrelatedInterval {
            start_ms,
            phase: phase.to_string(),
            result: classify_pair(pair),
        })
        .collect()
}

fn classify_pair(pair: Pair) -> Correlation {
    let class = match (pair.lan, pair.wan) {
        (None, _) => {
            return Correlation::Unclassifiable {
                missing: Source::Lan,
            };
        }
        (_, None) => {
            return Correlation::Unclassifiable {
                missing: Source::Wan,
            };
        }
        (Some(false), Some(true)) => CorrelationClass::WanDegraded,
        (Some(true), Some(false)) => CorrelationClass::LanDegraded,
        (Some(true), Some(true)) => CorrelationClass::BothDegraded,
        (Some(false), Some(false)) => CorrelationClass::Neither,
    };
    Correlation::Classified { class }
}

pub fn correlation_counts(intervals: &[CorrelatedInterval]) -> CorrelationCounts {
    let mut counts = CorrelationCounts::default();
    for i in intervals {
        match i.result {
            Correlation::Classified { class } => match class {
                CorrelationClass::WanDegraded => counts.wan_degraded += 1,
                CorrelationClass::LanDegraded => counts.lan_degraded += 1,
                CorrelationClass::BothDegraded => counts.both_degraded += 1,
                CorrelationClass::Neither => counts.neither += 1,
            },
            Correlation::Unclassifiable { .. } => counts.unclassifiable += 1,
        }
    }
    counts
}
