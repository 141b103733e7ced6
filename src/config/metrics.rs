//! Metrics configuration.

use super::defaults::default_metrics_snapshot_interval_secs;
use serde::{Deserialize, Serialize};

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Interval between background metrics log lines (seconds).
    pub snapshot_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            snapshot_interval_secs: default_metrics_snapshot_interval_secs(),
        }
    }
}
