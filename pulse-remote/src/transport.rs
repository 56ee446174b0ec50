use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tokio::net::UdpSocket;
use tokio::time;
use tracing::{info, trace};

use pulse_core::ext::system_time_millis;

use crate::config::transport::UdpTransport;
use crate::peer_watcher::PeerWatcherHandle;

/// Receives zero-payload heartbeat datagrams and forwards each source
/// address, stamped with its arrival time, to the watcher.
pub struct HeartbeatListener {
    socket: UdpSocket,
    watcher: PeerWatcherHandle,
}

impl HeartbeatListener {
    pub async fn bind(transport: &UdpTransport, watcher: PeerWatcherHandle) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind(transport.heartbeat_addr)
            .await
            .context("binding heartbeat socket")?;
        info!("listening for heartbeats on {}", socket.local_addr()?);
        Ok(Self { socket, watcher })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let mut buf = [0u8; 16];
        loop {
            let (_, peer) = self.socket.recv_from(&mut buf).await?;
            trace!("heartbeat datagram from {}", peer);
            self.watcher.heartbeat(peer, system_time_millis())?;
        }
    }
}

/// Periodically announces the monitor on the broadcast address and asks the
/// watcher to log a liveness report.
pub struct BeaconBroadcaster {
    socket: UdpSocket,
    beacon_addr: SocketAddr,
    interval: Duration,
    watcher: PeerWatcherHandle,
}

impl BeaconBroadcaster {
    pub async fn bind(
        transport: &UdpTransport,
        interval: Duration,
        watcher: PeerWatcherHandle,
    ) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .context("binding beacon socket")?;
        socket
            .set_broadcast(true)
            .context("enabling broadcast on beacon socket")?;
        info!("broadcasting beacons to {}", transport.beacon_addr);
        Ok(Self {
            socket,
            beacon_addr: transport.beacon_addr,
            interval,
            watcher,
        })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let mut ticker = time::interval(self.interval);
        loop {
            ticker.tick().await;
            self.socket.send_to(&[], self.beacon_addr).await?;
            self.watcher.report(system_time_millis())?;
        }
    }
}
