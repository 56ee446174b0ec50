use std::net::SocketAddr;

use tokio::sync::mpsc::error::SendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use pulse_core::config::ColdStartConfig;
use pulse_core::failure_detector::cold_start_failure_detector::ColdStartFailureDetector;
use pulse_core::failure_detector::default_failure_detector_registry::DefaultFailureDetectorRegistry;
use pulse_core::failure_detector::failure_detector_registry::FailureDetectorRegistry;

/// Liveness verdict for one peer at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerReport {
    pub peer: SocketAddr,
    pub available: bool,
    pub phi: f64,
}

#[derive(Debug)]
pub enum PeerWatcherMessage {
    /// A heartbeat datagram from `peer` arrived at `timestamp`.
    Heartbeat { peer: SocketAddr, timestamp: i64 },
    /// Evaluate every monitored peer and log the liveness table.
    Report { timestamp: i64 },
    /// Evaluate every monitored peer and reply with the table.
    Snapshot {
        timestamp: i64,
        reply: oneshot::Sender<Vec<PeerReport>>,
    },
}

/// Single owner of the per-peer failure detectors.
///
/// Heartbeats arrive from the listener loop and availability polls from the
/// broadcast loop; both funnel through this task's channel, which serializes
/// every touch of a given peer's detector without any locking. Across peers
/// the detectors are independent, so one task is plenty.
pub struct PeerWatcher {
    registry: DefaultFailureDetectorRegistry<SocketAddr>,
    receiver: mpsc::UnboundedReceiver<PeerWatcherMessage>,
}

#[derive(Debug, Clone)]
pub struct PeerWatcherHandle {
    sender: mpsc::UnboundedSender<PeerWatcherMessage>,
}

impl PeerWatcher {
    pub fn new(config: &ColdStartConfig) -> (Self, PeerWatcherHandle) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let config = config.clone();
        let registry = DefaultFailureDetectorRegistry::new(move || {
            Box::new(ColdStartFailureDetector::new(&config))
        });
        (Self { registry, receiver }, PeerWatcherHandle { sender })
    }

    /// Drain the channel until every handle is gone.
    pub async fn run(mut self) {
        while let Some(message) = self.receiver.recv().await {
            self.handle(message);
        }
        debug!("all watcher handles dropped, stopping");
    }

    fn handle(&mut self, message: PeerWatcherMessage) {
        match message {
            PeerWatcherMessage::Heartbeat { peer, timestamp } => {
                self.registry.heartbeat(peer, timestamp);
            }
            PeerWatcherMessage::Report { timestamp } => {
                for report in self.snapshot(timestamp) {
                    info!(
                        "{}: available={} phi={:.2}",
                        report.peer, report.available, report.phi
                    );
                }
            }
            PeerWatcherMessage::Snapshot { timestamp, reply } => {
                let _ = reply.send(self.snapshot(timestamp));
            }
        }
    }

    fn snapshot(&mut self, timestamp: i64) -> Vec<PeerReport> {
        let peers: Vec<SocketAddr> = self.registry.monitored().copied().collect();
        let mut reports = Vec::with_capacity(peers.len());
        for peer in peers {
            // read phi before the query: a crash-detecting query resets the
            // detector, and the report should show the phi that caused it
            let phi = self
                .registry
                .resource_to_failure_detector
                .get(&peer)
                .map(|detector| detector.suspicion_level(timestamp))
                .unwrap_or(0.0);
            let available = self.registry.is_available(&peer, timestamp);
            reports.push(PeerReport { peer, available, phi });
        }
        reports.sort_by_key(|report| report.peer);
        reports
    }
}

impl PeerWatcherHandle {
    pub fn heartbeat(
        &self,
        peer: SocketAddr,
        timestamp: i64,
    ) -> Result<(), SendError<PeerWatcherMessage>> {
        self.sender
            .send(PeerWatcherMessage::Heartbeat { peer, timestamp })
    }

    pub fn report(&self, timestamp: i64) -> Result<(), SendError<PeerWatcherMessage>> {
        self.sender.send(PeerWatcherMessage::Report { timestamp })
    }

    /// Ask the watcher for the current liveness table. Returns an empty
    /// table if the watcher task is gone.
    pub async fn snapshot(&self, timestamp: i64) -> Vec<PeerReport> {
        let (reply, receiver) = oneshot::channel();
        if self
            .sender
            .send(PeerWatcherMessage::Snapshot { timestamp, reply })
            .is_err()
        {
            return Vec::new();
        }
        receiver.await.unwrap_or_default()
    }
}

#[cfg(test)]
mod peer_watcher_spec {
    use std::net::SocketAddr;

    use pulse_core::config::phi_accrual::PhiAccrualConfig;
    use pulse_core::config::survival::SurvivalConfig;
    use pulse_core::config::ColdStartConfig;

    use super::PeerWatcher;

    /// Same shape as the core detector tests: the survival gate opens after
    /// roughly 31 seconds of steady uptime.
    fn test_config() -> ColdStartConfig {
        ColdStartConfig {
            phi: PhiAccrualConfig {
                acceptable_heartbeat_pause_millis: 0,
                ..PhiAccrualConfig::default()
            },
            survival: SurvivalConfig {
                scale_secs: 60,
                first_uptime_estimate_secs: 60,
                window_size: 3,
                threshold: 0.6,
            },
        }
    }

    #[tokio::test]
    async fn tracks_peers_through_their_lifecycle() {
        let (watcher, handle) = PeerWatcher::new(&test_config());
        let task = tokio::spawn(watcher.run());
        let peer: SocketAddr = "127.0.0.1:9000".parse().unwrap();

        assert!(handle.snapshot(0).await.is_empty());

        for t in (0..=40_000i64).step_by(1000) {
            handle.heartbeat(peer, t).unwrap();
        }
        // the first query past the gate performs the promotion and still
        // reports the peer as unavailable
        let reports = handle.snapshot(40_000).await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].peer, peer);
        assert!(!reports[0].available);

        let reports = handle.snapshot(41_000).await;
        assert!(reports[0].available);
        assert!(reports[0].phi < 8.0);

        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn a_silent_peer_drops_out_of_the_table() {
        let (watcher, handle) = PeerWatcher::new(&test_config());
        let task = tokio::spawn(watcher.run());
        let peer: SocketAddr = "127.0.0.1:9001".parse().unwrap();

        for t in (0..=40_000i64).step_by(1000) {
            handle.heartbeat(peer, t).unwrap();
        }
        handle.snapshot(40_000).await;
        let reports = handle.snapshot(41_000).await;
        assert!(reports[0].available);

        // 30 s of silence: reported unavailable, with the phi that did it
        let reports = handle.snapshot(71_000).await;
        assert!(!reports[0].available);
        assert!(reports[0].phi > 8.0);

        drop(handle);
        task.await.unwrap();
    }
}
