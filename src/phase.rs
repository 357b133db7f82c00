// Current provider label. Read once per ingest and stamped on every sample
// of that invocation; the engine keeps no global "current phase".

use std::path::Path;

use tracing::debug;

pub const UNKNOWN_PHASE: &str = "UNKNOWN";

/// Non-empty `env_phase` wins, then the trimmed phase file, then UNKNOWN.
pub fn read_phase(env_phase: Option<&str>, phase_file: &Path) -> String {
    if let Some(p) = env_phase.map(str::trim).filter(|p| !p.is_empty()) {
        return p.to_string();
    }
    match std::fs::read_to_string(phase_file) {
        Ok(contents) if !contents.trim().is_empty() => contents.trim().to_string(),
        Ok(_) => UNKNOWN_PHASE.to_string(),
        Err(e) => {
            debug!(path = %phase_file.display(), error = %e, "phase file unreadable");
            UNKNOWN_PHASE.to_string()
        }
    }
}

/// `read_phase` with the `PHASE` environment variable.
pub fn current_phase(phase_file: &Path) -> String {
    let env_phase = std::env::var("PHASE").ok();
    read_phase(env_phase.as_deref(), phase_file)
}
