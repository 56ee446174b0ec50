use serde::{Deserialize, Serialize};

/// Tuning of the Weibull survival window that guards the cold start.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurvivalConfig {
    /// Characteristic lifetime of a peer, in seconds.
    pub scale_secs: u64,
    /// Expected uptime of a peer with no recorded failure history yet, in
    /// seconds. The initial shape parameter is `scale / estimate`.
    pub first_uptime_estimate_secs: u64,
    /// Number of past up-durations retained for the shape estimate.
    pub window_size: usize,
    /// Survival probability below which the observed uptime counts as
    /// statistically significant, promoting the peer to stable.
    pub threshold: f64,
}

impl Default for SurvivalConfig {
    fn default() -> Self {
        Self {
            scale_secs: 1200,
            first_uptime_estimate_secs: 60,
            window_size: 3,
            threshold: 0.6,
        }
    }
}
