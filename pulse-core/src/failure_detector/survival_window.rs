use std::collections::VecDeque;

use crate::config::survival::SurvivalConfig;

/// Rolling Weibull survival model over the lengths of a peer's past
/// up-periods.
///
/// The window answers one question: has the current up-period already lasted
/// long enough to be statistically meaningful? Under the model, the
/// probability that an up-period lasts at least `x` seconds is
/// exp(-(x / scale)^shape). Once that probability drops below the configured
/// threshold, the observed uptime is no longer something a flapping peer
/// would plausibly produce, and the peer may be trusted as stable.
///
/// The shape parameter is re-estimated from the arithmetic mean of the most
/// recent up-durations every time a crash closes an up-period, so peers with
/// a history of long uptimes clear the gate faster on their next cycle.
pub struct SurvivalWindow {
    scale: f64,
    shape: f64,
    threshold: f64,
    window_size: usize,
    durations: VecDeque<f64>,
    on_time: Option<i64>,
}

impl SurvivalWindow {
    pub fn new(scale: f64, first_uptime_estimate: f64, window_size: usize, threshold: f64) -> Self {
        assert!(scale > 0.0, "survival.scale must be > 0");
        assert!(
            first_uptime_estimate > 0.0,
            "survival.first-uptime-estimate must be > 0"
        );
        assert!(window_size >= 1, "survival.window-size must be >= 1");
        Self {
            scale,
            shape: scale / first_uptime_estimate,
            threshold,
            window_size,
            durations: VecDeque::with_capacity(window_size),
            on_time: None,
        }
    }

    pub fn from_config(config: &SurvivalConfig) -> Self {
        Self::new(
            config.scale_secs as f64,
            config.first_uptime_estimate_secs as f64,
            config.window_size,
            config.threshold,
        )
    }

    /// Probability that an up-period lasts at least `uptime_secs` under the
    /// current shape estimate.
    pub fn survival_probability(&self, uptime_secs: f64) -> f64 {
        f64::exp(-(uptime_secs / self.scale).powf(self.shape))
    }

    /// Whether an up-period clock is currently running.
    pub fn is_running(&self) -> bool {
        self.on_time.is_some()
    }

    /// Current shape estimate (k), for diagnostics.
    pub fn shape(&self) -> f64 {
        self.shape
    }

    /// Lengths of the retained past up-periods in seconds, oldest first.
    pub fn recorded_uptimes(&self) -> impl ExactSizeIterator<Item = f64> + '_ {
        self.durations.iter().copied()
    }

    /// Start the up-period clock at `timestamp`.
    pub fn started(&mut self, timestamp: i64) {
        self.on_time = Some(timestamp);
    }

    /// Close the current up-period at `timestamp`: fold its length into the
    /// rolling window and re-estimate the shape from the window mean. The
    /// recompute is skipped when the mean is not positive, which keeps the
    /// shape strictly positive even if a crash lands in the same millisecond
    /// the clock started.
    pub fn failed(&mut self, timestamp: i64) {
        let Some(on_time) = self.on_time.take() else {
            return;
        };
        let duration = (timestamp - on_time) as f64 / 1000.0;
        if self.durations.len() == self.window_size {
            self.durations.pop_front();
        }
        self.durations.push_back(duration);
        let mean = self.durations.iter().sum::<f64>() / self.durations.len() as f64;
        if mean > 0.0 {
            self.shape = self.scale / mean;
        }
    }

    /// While the clock runs: has the elapsed uptime already become
    /// improbable to survive under the current model? Always false when no
    /// up-period is in progress.
    pub fn is_stable(&self, timestamp: i64) -> bool {
        match self.on_time {
            None => false,
            Some(on_time) => {
                let uptime = (timestamp - on_time) as f64 / 1000.0;
                self.survival_probability(uptime) < self.threshold
            }
        }
    }
}

#[cfg(test)]
mod survival_window_spec {
    use super::SurvivalWindow;

    #[test]
    fn survival_probability_decays_from_one() {
        let window = SurvivalWindow::new(60.0, 60.0, 3, 0.6);
        assert!((window.survival_probability(0.0) - 1.0).abs() < 1e-12);
        assert!(window.survival_probability(30.0) > window.survival_probability(60.0));
        assert!(window.survival_probability(600.0) < 0.01);
    }

    #[test]
    fn stability_needs_a_running_clock() {
        let mut window = SurvivalWindow::new(60.0, 60.0, 3, 0.6);
        assert!(!window.is_stable(1_000_000));
        window.started(0);
        // shape 1.0: exp(-x/60) < 0.6 once x exceeds ~30.65 s
        assert!(!window.is_stable(30_000));
        assert!(window.is_stable(31_000));
    }

    #[test]
    fn failed_reestimates_the_shape_from_the_window_mean() {
        let mut window = SurvivalWindow::new(60.0, 60.0, 3, 0.6);
        window.started(0);
        window.failed(30_000);
        assert!(!window.is_running());
        assert!((window.shape() - 2.0).abs() < 1e-9);
        window.started(40_000);
        window.failed(130_000);
        // mean of 30 s and 90 s is 60 s
        assert!((window.shape() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn the_window_is_bounded() {
        let mut window = SurvivalWindow::new(60.0, 60.0, 2, 0.6);
        for cycle in 0..4i64 {
            window.started(cycle * 100_000);
            window.failed(cycle * 100_000 + 10_000);
        }
        assert_eq!(window.recorded_uptimes().len(), 2);
    }

    #[test]
    fn shape_survives_a_zero_length_up_period() {
        let mut window = SurvivalWindow::new(60.0, 60.0, 3, 0.6);
        window.started(5000);
        window.failed(5000);
        assert!(window.shape() > 0.0);
    }

    #[test]
    fn longer_uptime_history_relaxes_the_gate() {
        let mut strict = SurvivalWindow::new(1200.0, 60.0, 3, 0.6);
        let mut relaxed = SurvivalWindow::new(1200.0, 60.0, 3, 0.6);
        relaxed.started(0);
        relaxed.failed(2_400_000); // one 2400 s up-period on record
        strict.started(0);
        relaxed.started(0);
        // after six minutes the peer with the long-uptime history is already
        // past the gate while the fresh one is not
        assert!(relaxed.is_stable(360_000));
        assert!(!strict.is_stable(360_000));
    }
}
