use std::collections::VecDeque;
use std::time::Duration;

use tracing::warn;

use crate::config::phi_accrual::PhiAccrualConfig;
use crate::failure_detector::FailureDetector;

/// Implementation of 'The Phi Accrual Failure Detector' by Hayashibara et al.
/// as defined in their paper:
/// [https://oneofus.la/have-emacs-will-hack/files/HDY04.pdf]
///
/// The suspicion level of failure is given by a value called φ (phi),
/// expressed on a scale that is dynamically adjusted to current network
/// conditions: φ = -log10(1 - F(timeSinceLastHeartbeat)), where F is the
/// cumulative distribution function of a normal distribution with mean and
/// standard deviation estimated from historical inter-arrival times. A
/// configurable threshold turns the graded value into a binary verdict.
///
/// The detector never reads a clock of its own; every query and every
/// heartbeat carries the caller's timestamp in epoch milliseconds.
pub struct PhiAccrualFailureDetector {
    pub threshold: f64,
    pub max_sample_size: usize,
    pub min_std_deviation: Duration,
    pub acceptable_heartbeat_pause: Duration,
    pub first_heartbeat_estimate: Duration,
    last_timestamp: Option<i64>,
    history: HeartbeatHistory,
}

impl PhiAccrualFailureDetector {
    pub fn new(
        threshold: f64,
        max_sample_size: usize,
        min_std_deviation: Duration,
        acceptable_heartbeat_pause: Duration,
        first_heartbeat_estimate: Duration,
    ) -> Self {
        assert!(threshold > 0.0, "failure-detector.threshold must be > 0");
        assert!(max_sample_size > 0, "failure-detector.max-sample-size must be > 0");
        Self {
            history: Self::seeded_history(first_heartbeat_estimate, max_sample_size),
            threshold,
            max_sample_size,
            min_std_deviation,
            acceptable_heartbeat_pause,
            first_heartbeat_estimate,
            last_timestamp: None,
        }
    }

    pub fn from_config(config: &PhiAccrualConfig) -> Self {
        Self::new(
            config.threshold,
            config.max_sample_size,
            Duration::from_millis(config.min_std_deviation_millis),
            Duration::from_millis(config.acceptable_heartbeat_pause_millis),
            Duration::from_millis(config.first_heartbeat_estimate_millis),
        )
    }

    /// Bootstrap the sample window with two synthetic intervals a quarter of
    /// the estimate on either side of it. The mean starts at the estimate
    /// with a rather high standard deviation, since the environment is
    /// unknown in the beginning.
    fn seeded_history(first_heartbeat_estimate: Duration, max_sample_size: usize) -> HeartbeatHistory {
        let mean = first_heartbeat_estimate.as_millis() as f64;
        let std_deviation = mean / 4.0;
        let mut history = HeartbeatHistory::new(max_sample_size);
        history.add(mean - std_deviation);
        history.add(mean + std_deviation);
        history
    }

    /// Drop everything learned about the resource and return to the
    /// bootstrap statistics, as if no heartbeat had ever arrived. Called
    /// when a crash has been detected so the next incarnation of the
    /// resource trains from scratch.
    pub fn reset(&mut self) {
        self.history = Self::seeded_history(self.first_heartbeat_estimate, self.max_sample_size);
        self.last_timestamp = None;
    }

    /// Suspicion level at `timestamp`. Zero until the first heartbeat, then
    /// growing without bound as the silence stretches past the learned
    /// inter-arrival gap.
    pub fn phi(&self, timestamp: i64) -> f64 {
        match self.last_timestamp {
            None => 0.0,
            Some(last_timestamp) => {
                let time_diff = (timestamp - last_timestamp) as f64;
                let mean = self.history.mean() + self.acceptable_heartbeat_pause_millis();
                let std_deviation = self.ensure_valid_std_deviation(self.history.std_deviation());
                Self::calc_phi(time_diff, mean, std_deviation)
            }
        }
    }

    /// Calculation of phi, derived from the cumulative distribution function
    /// of the N(mean, std_deviation) normal distribution, given by
    /// 1.0 / (1.0 + exp(-y * (1.5976 + 0.070566 * y * y)))
    /// where y = (x - mean) / standard_deviation.
    /// This is the logistic approximation from the β Mathematics Handbook;
    /// error is 0.00014 at ±3.16. The branch on `time_diff > mean` keeps the
    /// subtraction numerically benign on whichever tail is the small one.
    fn calc_phi(time_diff: f64, mean: f64, std_deviation: f64) -> f64 {
        let y = (time_diff - mean) / std_deviation;
        let e = f64::exp(-y * (1.5976 + 0.070566 * y * y));
        if time_diff > mean {
            -f64::log10(e / (1.0 + e))
        } else {
            -f64::log10(1.0 - 1.0 / (1.0 + e))
        }
    }

    fn ensure_valid_std_deviation(&self, std_deviation: f64) -> f64 {
        std_deviation.max(self.min_std_deviation.as_millis() as f64)
    }

    fn acceptable_heartbeat_pause_millis(&self) -> f64 {
        self.acceptable_heartbeat_pause.as_millis() as f64
    }

    pub fn is_available(&self, timestamp: i64) -> bool {
        self.phi(timestamp) < self.threshold
    }

    pub fn is_monitoring(&self) -> bool {
        self.last_timestamp.is_some()
    }

    /// Record a heartbeat that arrived at `timestamp`.
    ///
    /// The observed interval trains the statistics only if the detector
    /// still judged the resource available at the arrival instant, evaluated
    /// against the history as it stood before this heartbeat. A gap long
    /// enough to count as a crash would otherwise poison the window with one
    /// enormous sample. The last-heartbeat timestamp moves forward either
    /// way, so a recovering resource is measured from its recovery, not from
    /// before the outage.
    pub fn heartbeat(&mut self, timestamp: i64) {
        if let Some(last_timestamp) = self.last_timestamp {
            let interval = timestamp - last_timestamp;
            if self.is_available(timestamp) {
                let pause_millis = self.acceptable_heartbeat_pause.as_millis() as i64;
                if pause_millis > 0 && interval >= pause_millis / 3 * 2 {
                    warn!("heartbeat interval is growing too large: {} millis", interval);
                }
                self.history.add(interval as f64);
            }
        }
        self.last_timestamp = Some(timestamp);
    }
}

impl FailureDetector for PhiAccrualFailureDetector {
    fn is_available(&mut self, timestamp: i64) -> bool {
        PhiAccrualFailureDetector::is_available(self, timestamp)
    }

    fn is_monitoring(&self) -> bool {
        PhiAccrualFailureDetector::is_monitoring(self)
    }

    fn suspicion_level(&self, timestamp: i64) -> f64 {
        self.phi(timestamp)
    }

    fn heartbeat(&mut self, timestamp: i64) {
        PhiAccrualFailureDetector::heartbeat(self, timestamp)
    }
}

/// Bounded window of heartbeat inter-arrival intervals in milliseconds.
/// Running sums keep mean and variance O(1); evicting the oldest sample
/// subtracts its contribution before the new one is added, so the sums always
/// match the retained intervals exactly.
#[derive(Debug, Clone)]
struct HeartbeatHistory {
    max_sample_size: usize,
    intervals: VecDeque<f64>,
    interval_sum: f64,
    squared_interval_sum: f64,
}

impl HeartbeatHistory {
    fn new(max_sample_size: usize) -> Self {
        assert!(max_sample_size >= 1, "max_sample_size must be >= 1, got {}", max_sample_size);
        Self {
            max_sample_size,
            intervals: VecDeque::with_capacity(max_sample_size),
            interval_sum: 0.0,
            squared_interval_sum: 0.0,
        }
    }

    fn len(&self) -> usize {
        self.intervals.len()
    }

    fn mean(&self) -> f64 {
        debug_assert!(!self.intervals.is_empty(), "mean of an empty history");
        self.interval_sum / self.intervals.len() as f64
    }

    /// Population variance. Near-identical samples can cancel to a tiny
    /// negative value; `std_deviation` clamps before taking the root.
    fn variance(&self) -> f64 {
        self.squared_interval_sum / self.intervals.len() as f64 - self.mean() * self.mean()
    }

    fn std_deviation(&self) -> f64 {
        self.variance().max(0.0).sqrt()
    }

    fn add(&mut self, interval: f64) {
        if self.intervals.len() == self.max_sample_size {
            self.drop_oldest();
        }
        self.intervals.push_back(interval);
        self.interval_sum += interval;
        self.squared_interval_sum += interval * interval;
    }

    fn drop_oldest(&mut self) {
        if let Some(oldest) = self.intervals.pop_front() {
            self.interval_sum -= oldest;
            self.squared_interval_sum -= oldest * oldest;
        }
    }
}

#[cfg(test)]
mod accrual_failure_detector_spec {
    use std::time::Duration;

    use super::{HeartbeatHistory, PhiAccrualFailureDetector};

    fn detector() -> PhiAccrualFailureDetector {
        PhiAccrualFailureDetector::new(
            8.0,
            200,
            Duration::from_millis(200),
            Duration::ZERO,
            Duration::from_millis(1000),
        )
    }

    #[test]
    fn mean_tracks_the_newest_samples() {
        let mut history = HeartbeatHistory::new(4);
        for interval in [100.0, 200.0, 300.0, 400.0, 500.0, 600.0] {
            history.add(interval);
        }
        assert_eq!(history.len(), 4);
        assert!((history.mean() - 450.0).abs() < 1e-9);
    }

    #[test]
    fn running_sums_survive_eviction() {
        let mut history = HeartbeatHistory::new(3);
        for interval in [100.0, 200.0, 300.0] {
            history.add(interval);
        }
        let variance = (100.0_f64 * 100.0 + 200.0 * 200.0 + 300.0 * 300.0) / 3.0 - 200.0 * 200.0;
        assert!((history.variance() - variance).abs() < 1e-9);
        history.add(400.0);
        // window is now 200, 300, 400
        assert!((history.mean() - 300.0).abs() < 1e-9);
    }

    #[test]
    fn std_deviation_is_never_negative() {
        let mut history = HeartbeatHistory::new(16);
        for _ in 0..16 {
            history.add(1000.0);
        }
        assert!(history.std_deviation() >= 0.0);
        assert!(history.std_deviation() < 1e-6);
    }

    #[test]
    fn phi_is_zero_until_the_first_heartbeat() {
        let fd = detector();
        assert_eq!(fd.phi(0), 0.0);
        assert_eq!(fd.phi(1_000_000), 0.0);
        assert!(fd.is_available(1_000_000));
        assert!(!fd.is_monitoring());
    }

    #[test]
    fn phi_is_small_right_after_a_heartbeat() {
        let mut fd = detector();
        fd.heartbeat(0);
        assert!(fd.is_monitoring());
        assert!(fd.phi(0) < 0.1);
        assert!(fd.is_available(0));
    }

    #[test]
    fn phi_grows_as_the_silence_stretches() {
        let mut fd = detector();
        fd.heartbeat(0);
        // seeded history: mean 1000 ms, std deviation 250 ms
        let samples = [1000, 2000, 3000, 6000];
        let phis: Vec<f64> = samples.iter().map(|&t| fd.phi(t)).collect();
        for pair in phis.windows(2) {
            assert!(pair[1] > pair[0], "phi must grow with silence: {:?}", phis);
        }
        assert!(fd.phi(30_000) > fd.threshold);
        assert!(!fd.is_available(30_000));
    }

    #[test]
    fn steady_heartbeats_keep_the_resource_available() {
        let mut fd = detector();
        for t in (0..=20_000).step_by(1000) {
            fd.heartbeat(t);
            assert!(fd.is_available(t), "available at {}", t);
        }
        assert!(fd.is_available(21_500));
    }

    #[test]
    fn a_crash_length_gap_is_kept_out_of_the_history() {
        let mut fd = detector();
        for t in (0..=10_000).step_by(1000) {
            fd.heartbeat(t);
        }
        let samples_before = fd.history.len();
        assert!(!fd.is_available(40_000));
        fd.heartbeat(40_000);
        assert_eq!(fd.history.len(), samples_before);
        assert!((fd.history.mean() - 1000.0).abs() < 100.0);
    }

    #[test]
    fn a_rejected_interval_still_moves_the_timestamp() {
        let mut fd = detector();
        for t in (0..=10_000).step_by(1000) {
            fd.heartbeat(t);
        }
        fd.heartbeat(40_000);
        // measured from the recovery heartbeat, the resource looks fine again
        assert!(fd.is_available(40_500));
    }

    #[test]
    fn reset_returns_to_the_bootstrap_state() {
        let mut fd = detector();
        for t in (0..=5000).step_by(1000) {
            fd.heartbeat(t);
        }
        fd.reset();
        assert!(!fd.is_monitoring());
        assert_eq!(fd.phi(6000), 0.0);
        assert_eq!(fd.history.len(), 2);
    }
}
