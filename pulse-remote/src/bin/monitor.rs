use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use config::File;

use pulse_core::ext::init_logger_with_filter;
use pulse_remote::config::RemoteConfig;
use pulse_remote::peer_watcher::PeerWatcher;
use pulse_remote::transport::{BeaconBroadcaster, HeartbeatListener};

/// Watches a cluster of peers over UDP heartbeats and reports, once per
/// poll interval, which of them are up.
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

    let (watcher, handle) = PeerWatcher::new(&config.failure_detector);
    let listener = HeartbeatListener::bind(&config.transport, handle.clone()).await?;
    let broadcaster = BeaconBroadcaster::bind(
        &config.transport,
        Duration::from_millis(config.poll_interval_millis),
        handle,
    )
    .await?;

    let watcher_task = tokio::spawn(watcher.run());
    tokio::select! {
        result = listener.run() => result?,
        result = broadcaster.run() => result?,
        _ = watcher_task => {}
    }
    Ok(())
}
