use serde::{Deserialize, Serialize};

/// Tuning of the phi accrual failure detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhiAccrualConfig {
    /// Suspicion level above which a peer is considered crashed. A low
    /// threshold detects real crashes quickly but raises more false alarms;
    /// a high threshold makes fewer mistakes and needs more time.
    pub threshold: f64,
    /// Number of inter-arrival samples used for the mean and standard
    /// deviation estimates.
    pub max_sample_size: usize,
    /// Floor for the standard deviation (ms). Very regular heartbeats would
    /// otherwise make the detector oversensitive to ordinary jitter.
    pub min_std_deviation_millis: u64,
    /// Slack added to the expected gap (ms) so a few lost or delayed
    /// heartbeats are not immediately treated as an anomaly.
    pub acceptable_heartbeat_pause_millis: u64,
    /// Assumed heartbeat interval (ms) before anything real has arrived.
    pub first_heartbeat_estimate_millis: u64,
}

impl Default for PhiAccrualConfig {
    fn default() -> Self {
        Self {
            threshold: 8.0,
            max_sample_size: 200,
            min_std_deviation_millis: 200,
            acceptable_heartbeat_pause_millis: 3000,
            first_heartbeat_estimate_millis: 1000,
        }
    }
}
