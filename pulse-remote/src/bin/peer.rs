use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use config::File;
use tokio::net::UdpSocket;
use tracing::{debug, info};

use pulse_core::ext::init_logger_with_filter;
use pulse_remote::config::RemoteConfig;

/// Answers every monitor beacon with a zero-payload heartbeat datagram.
#[derive(Parser, Debug)]
struct Args {
    /// TOML file layered over the built-in reference settings.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Log filter, e.g. "pulse=trace".
    #[arg(short, long, default_value = "pulse=debug")]
    log_filter: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logger_with_filter(args.log_filter.as_str());
    let mut builder = RemoteConfig::builder();
    if let Some(path) = args.config {
        builder = builder.add_source(File::from(path));
    }
    let config = builder.build()?;

    let socket = UdpSocket::bind(config.transport.beacon_listen_addr).await?;
    socket.set_broadcast(true)?;
    info!("answering beacons on {}", socket.local_addr()?);
    let heartbeat_port = config.transport.heartbeat_addr.port();
    let mut buf = [0u8; 16];
    loop {
        let (_, beacon) = socket.recv_from(&mut buf).await?;
        let monitor = SocketAddr::new(beacon.ip(), heartbeat_port);
        debug!("beacon from {}, heartbeating {}", beacon, monitor);
        socket.send_to(&[], monitor).await?;
    }
}
