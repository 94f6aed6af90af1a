//! Point-in-time telemetry snapshot.

use serde::Serialize;

/// Copy of the resolver counters at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    pub uptime_secs: u64,
    pub requests_started: u64,
    pub requests_succeeded: u64,
    pub requests_failed: u64,
    pub requests_rejected: u64,
    pub cells_cached: u64,
    pub cells_stored: u64,
    pub cells_computed: u64,
    pub cells_coalesced: u64,
    pub cache_errors: u64,
    pub store_errors: u64,
    pub engine_errors: u64,
    pub engine_calls: u64,
    pub engine_time_ms: u64,
}

impl TelemetrySnapshot {
    /// Total cells resolved by any tier.
    pub fn cells_resolved(&self) -> u64 {
        self.cells_cached + self.cells_stored + self.cells_computed
    }

    /// Fraction of resolved cells served from the memory cache (0.0 - 1.0).
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.cells_resolved();
        if total == 0 {
            0.0
        } else {
            self.cells_cached as f64 / total as f64
        }
    }

    /// Mean engine call duration in milliseconds.
    pub fn avg_engine_ms(&self) -> f64 {
        if self.engine_calls == 0 {
            0.0
        } else {
            self.engine_time_ms as f64 / self.engine_calls as f64
        }
    }

    /// Uptime formatted as `HH:MM:SS`.
    pub fn uptime_human(&self) -> String {
        let secs = self.uptime_secs;
        format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
