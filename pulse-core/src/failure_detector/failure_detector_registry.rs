use std::fmt::Debug;
use std::hash::Hash;

/// A set of failure detectors keyed by the resource they monitor.
///
/// Detectors are created on demand when a resource's first heartbeat is
/// seen. As with [`FailureDetector`](crate::failure_detector::FailureDetector),
/// all timestamps are caller supplied epoch milliseconds.
pub trait FailureDetectorRegistry: Debug + Send {
    type A: Hash + Eq;

    /// Whether `resource` is considered available at `timestamp`. Resources
    /// that were never monitored are available: there is no evidence of
    /// failure.
    fn is_available(&mut self, resource: &Self::A, timestamp: i64) -> bool;

    /// Whether a heartbeat from `resource` has been observed.
    fn is_monitoring(&self, resource: &Self::A) -> bool;

    /// Record a heartbeat from `resource` at `timestamp`, creating its
    /// detector if this is the first one.
    fn heartbeat(&mut self, resource: Self::A, timestamp: i64);

    /// Forget `resource` entirely.
    fn remove(&mut self, resource: &Self::A);

    /// Forget every monitored resource.
    fn reset(&mut self);
}
