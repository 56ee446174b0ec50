use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// Addresses of the connectionless heartbeat fabric.
///
/// Heartbeats and beacons are zero-payload datagrams; the source address and
/// the arrival time carry all the information there is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UdpTransport {
    /// Where the monitor listens for peer heartbeats. Peers derive their
    /// reply target from a beacon's source address plus this port.
    pub heartbeat_addr: SocketAddr,
    /// Broadcast destination for the monitor's presence beacons.
    pub beacon_addr: SocketAddr,
    /// Where peers listen for those beacons.
    pub beacon_listen_addr: SocketAddr,
}
