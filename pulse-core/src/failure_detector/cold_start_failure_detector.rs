use tracing::debug;

use crate::config::ColdStartConfig;
use crate::failure_detector::phi_accrual_failure_detector::PhiAccrualFailureDetector;
use crate::failure_detector::survival_window::SurvivalWindow;
use crate::failure_detector::FailureDetector;

/// Lifecycle of a monitored peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    /// No heartbeat observed since the last detected crash, or ever.
    Off,
    /// Heartbeats are arriving but the peer has not yet been up long enough
    /// to be trusted.
    Unstable,
    /// The peer cleared its cold start and is reported available for as long
    /// as phi stays under the threshold.
    Stable,
}

/// Accrual failure detection gated by a cold-start confidence model.
///
/// A plain accrual detector starts trusting a peer on its very first
/// heartbeat, so a flapping peer is reported up over and over again. Here
/// the phi detector only decides *crashes*; a peer that is heartbeating is
/// reported available only once the survival window judges its current
/// uptime statistically significant. Peers with consistently short
/// up-periods oscillate between Off and Unstable forever without ever being
/// reported available, which is the point.
pub struct ColdStartFailureDetector {
    phi: PhiAccrualFailureDetector,
    survival: SurvivalWindow,
    is_on: bool,
    is_stable: bool,
}

impl ColdStartFailureDetector {
    pub fn new(config: &ColdStartConfig) -> Self {
        Self {
            phi: PhiAccrualFailureDetector::from_config(&config.phi),
            survival: SurvivalWindow::from_config(&config.survival),
            is_on: false,
            is_stable: false,
        }
    }

    pub fn state(&self) -> PeerState {
        match (self.is_on, self.is_stable) {
            (false, _) => PeerState::Off,
            (true, false) => PeerState::Unstable,
            (true, true) => PeerState::Stable,
        }
    }

    /// Current suspicion level, for reporting.
    pub fn phi(&self, timestamp: i64) -> f64 {
        self.phi.phi(timestamp)
    }

    /// The survival window, for diagnostics.
    pub fn survival(&self) -> &SurvivalWindow {
        &self.survival
    }

    /// Record a heartbeat that arrived at `timestamp`. The first heartbeat
    /// after Off starts the up-period clock.
    pub fn heartbeat(&mut self, timestamp: i64) {
        if !self.is_on {
            debug!("heartbeat detected, peer enters its cold start");
        }
        self.is_on = true;
        if !self.survival.is_running() {
            self.survival.started(timestamp);
        }
        self.phi.heartbeat(timestamp);
    }

    /// Point-in-time availability query, and the only place transitions out
    /// of Unstable and Stable happen.
    ///
    /// Phi crossing its threshold is the sole trigger back to Off; the
    /// survival window is the sole gate for promotion to Stable. The query
    /// that performs the promotion still reports unavailable, the promotion
    /// pays off from the next query on.
    pub fn is_available(&mut self, timestamp: i64) -> bool {
        if !self.is_on {
            return false;
        }
        if self.is_stable {
            if self.phi.is_available(timestamp) {
                true
            } else {
                debug!("crash detected on a stable peer");
                self.crashed(timestamp);
                false
            }
        } else {
            if self.phi.is_available(timestamp) {
                if self.survival.is_stable(timestamp) {
                    debug!("peer survived its cold start, turns stable");
                    self.is_stable = true;
                }
            } else {
                debug!("crash detected during cold start");
                self.crashed(timestamp);
            }
            false
        }
    }

    fn crashed(&mut self, timestamp: i64) {
        self.phi.reset();
        self.survival.failed(timestamp);
        self.is_on = false;
        self.is_stable = false;
    }
}

impl FailureDetector for ColdStartFailureDetector {
    fn is_available(&mut self, timestamp: i64) -> bool {
        ColdStartFailureDetector::is_available(self, timestamp)
    }

    fn is_monitoring(&self) -> bool {
        self.is_on
    }

    fn suspicion_level(&self, timestamp: i64) -> f64 {
        self.phi(timestamp)
    }

    fn heartbeat(&mut self, timestamp: i64) {
        ColdStartFailureDetector::heartbeat(self, timestamp)
    }
}
