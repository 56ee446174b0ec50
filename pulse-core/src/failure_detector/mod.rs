pub mod cold_start_failure_detector;
pub mod default_failure_detector_registry;
pub mod failure_detector_registry;
pub mod phi_accrual_failure_detector;
pub mod survival_window;

/// Liveness oracle for a single monitored resource.
///
/// Implementations consume heartbeat arrival times and answer point-in-time
/// availability queries. Timestamps are milliseconds since the unix epoch and
/// are always supplied by the caller, so detectors stay clock-free and
/// deterministic under test. `is_available` takes `&mut self`: an accrual
/// detector may fold a detected crash back into its own state.
pub trait FailureDetector: Send {
    /// Whether the resource is considered available at `timestamp`.
    fn is_available(&mut self, timestamp: i64) -> bool;

    /// Whether any heartbeat has been observed yet.
    fn is_monitoring(&self) -> bool;

    /// Graded suspicion level at `timestamp`; higher means more suspicious.
    fn suspicion_level(&self, timestamp: i64) -> f64;

    /// Record a heartbeat that arrived at `timestamp`.
    fn heartbeat(&mut self, timestamp: i64);
}
