use serde::{Deserialize, Serialize};

/// Diagnostics for debugging staging sessions.
///
/// All counters are monotonic for the lifetime of the session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Number of pump cycles executed (including cycles that wrote nothing).
    pub pump_cycles: u64,
    /// Total samples committed to the ring.
    pub samples_committed: u64,
    /// Pump cycles where the source produced fewer samples than requested.
    pub short_reads: u64,
    /// Discontinuities found by glitch scans.
    pub discontinuities: u64,
}
