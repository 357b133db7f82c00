// LAN vs WAN correlation results.

use serde::{Deserialize, Serialize};

use super::Source;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CorrelationClass {
    /// WAN bad, LAN fine: upstream issue.
    WanDegraded,
    /// LAN bad, WAN fine: local issue.
    LanDegraded,
    BothDegraded,
    Neither,
}

impl CorrelationClass {
    /// Same verdict with the LAN and WAN roles exchanged.
    pub fn swapped(self) -> Self {
        match self {
            CorrelationClass::WanDegraded => CorrelationClass::LanDegraded,
            CorrelationClass::LanDegraded => CorrelationClass::WanDegraded,
            other => other,
        }
    }
}

/// Outcome for one aligned interval. `Unclassifiable` is never "fine": a
/// missing bucket may itself mean an outage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Correlation {
    Classified { class: CorrelationClass },
    Unclassifiable { missing: Source },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelatedInterval {
    pub start_ms: i64,
    pub phase: String,
    pub result: Correlation,
}

/// Tally of correlation outcomes over a range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationCounts {
    pub wan_degraded: usize,
    pub lan_degraded: usize,
    pub both_degraded: usize,
    pub neither: usize,
    pub unclassifiable: usize,
}
