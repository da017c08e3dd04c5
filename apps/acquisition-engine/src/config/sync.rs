//! Clock synchronization tuning.

use serde::{Deserialize, Serialize};

/// Clock sync configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Probes per measurement.
    #[serde(default = "default_probe_count")]
    pub probe_count: usize,
    /// RTT assumed when every probe fails.
    #[serde(default = "default_rtt_ms")]
    pub default_rtt_ms: u64,
    /// How long before the open instant the coarse wait ends and the
    /// session logs in and measures.
    #[serde(default = "default_pre_position_ms")]
    pub pre_position_ms: u64,
    /// Below this distance `wait_until` polls instead of sleeping.
    #[serde(default = "default_spin_threshold_ms")]
    pub spin_threshold_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            probe_count: default_probe_count(),
            default_rtt_ms: default_rtt_ms(),
            pre_position_ms: default_pre_position_ms(),
            spin_threshold_ms: default_spin_threshold_ms(),
        }
    }
}

const fn default_probe_count() -> usize {
    5
}

const fn default_rtt_ms() -> u64 {
    200
}

const fn default_pre_position_ms() -> u64 {
    30_000
}

const fn default_spin_threshold_ms() -> u64 {
    20
}
