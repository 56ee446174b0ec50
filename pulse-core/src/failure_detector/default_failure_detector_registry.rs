use std::any::type_name;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::hash::Hash;
use std::marker::PhantomData;

use crate::failure_detector::failure_detector_registry::FailureDetectorRegistry;
use crate::failure_detector::FailureDetector;

/// [`FailureDetectorRegistry`] backed by a plain map and a detector factory.
/// One detector per resource, created lazily on the resource's first
/// heartbeat.
pub struct DefaultFailureDetectorRegistry<A> {
    _phantom: PhantomData<A>,
    pub detector_factory: Box<dyn Fn() -> Box<dyn FailureDetector> + Send>,
    pub resource_to_failure_detector: HashMap<A, Box<dyn FailureDetector>>,
}

impl<A> DefaultFailureDetectorRegistry<A> {
    pub fn new<F>(factory: F) -> DefaultFailureDetectorRegistry<A>
    where
        F: Fn() -> Box<dyn FailureDetector> + Send + 'static,
    {
        Self {
            _phantom: Default::default(),
            detector_factory: Box::new(factory),
            resource_to_failure_detector: Default::default(),
        }
    }

    /// Resources currently being monitored, in no particular order.
    pub fn monitored(&self) -> impl Iterator<Item = &A> {
        self.resource_to_failure_detector.keys()
    }
}

impl<A> Debug for DefaultFailureDetectorRegistry<A> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let struct_name = format!("DefaultFailureDetectorRegistry<{}>", type_name::<A>());
        f.debug_struct(&struct_name).finish_non_exhaustive()
    }
}

impl<A> FailureDetectorRegistry for DefaultFailureDetectorRegistry<A>
where
    A: Send + Hash + Eq,
{
    type A = A;

    fn is_available(&mut self, resource: &Self::A, timestamp: i64) -> bool {
        match self.resource_to_failure_detector.get_mut(resource) {
            None => true,
            Some(detector) => detector.is_available(timestamp),
        }
    }

    fn is_monitoring(&self, resource: &Self::A) -> bool {
        match self.resource_to_failure_detector.get(resource) {
            None => false,
            Some(detector) => detector.is_monitoring(),
        }
    }

    fn heartbeat(&mut self, resource: Self::A, timestamp: i64) {
        match self.resource_to_failure_detector.entry(resource) {
            Entry::Occupied(mut o) => {
                o.get_mut().heartbeat(timestamp);
            }
            Entry::Vacant(v) => {
                let mut detector = (self.detector_factory)();
                detector.heartbeat(timestamp);
                v.insert(detector);
            }
        }
    }

    fn remove(&mut self, resource: &Self::A) {
        self.resource_to_failure_detector.remove(resource);
    }

    fn reset(&mut self) {
        self.resource_to_failure_detector.clear();
    }
}

#[cfg(test)]
mod default_failure_detector_registry_spec {
    use super::DefaultFailureDetectorRegistry;
    use crate::config::ColdStartConfig;
    use crate::failure_detector::cold_start_failure_detector::ColdStartFailureDetector;
    use crate::failure_detector::failure_detector_registry::FailureDetectorRegistry;

    fn registry() -> DefaultFailureDetectorRegistry<&'static str> {
        DefaultFailureDetectorRegistry::new(|| {
            Box::new(ColdStartFailureDetector::new(&ColdStartConfig::default()))
        })
    }

    #[test]
    fn unknown_resources_are_available_but_not_monitored() {
        let mut registry = registry();
        assert!(registry.is_available(&"a", 0));
        assert!(!registry.is_monitoring(&"a"));
        assert_eq!(registry.monitored().count(), 0);
    }

    #[test]
    fn the_first_heartbeat_creates_a_detector() {
        let mut registry = registry();
        registry.heartbeat("a", 1000);
        registry.heartbeat("b", 2000);
        assert!(registry.is_monitoring(&"a"));
        assert!(registry.is_monitoring(&"b"));
        assert_eq!(registry.monitored().count(), 2);
    }

    #[test]
    fn remove_and_reset_forget_resources() {
        let mut registry = registry();
        registry.heartbeat("a", 1000);
        registry.heartbeat("b", 2000);
        registry.remove(&"a");
        assert!(!registry.is_monitoring(&"a"));
        assert!(registry.is_monitoring(&"b"));
        registry.reset();
        assert_eq!(registry.monitored().count(), 0);
    }

    #[test]
    fn queries_are_routed_to_the_per_resource_detector() {
        let mut registry = registry();
        registry.heartbeat("a", 0);
        // a cold-starting peer is not yet reported available
        assert!(!registry.is_available(&"a", 0));
        // while an unmonitored one is
        assert!(registry.is_available(&"b", 0));
    }
}
