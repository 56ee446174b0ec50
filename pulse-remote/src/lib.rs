pub const REFERENCE: &str = include_str!("../reference.toml");

pub mod config;
pub mod peer_watcher;
pub mod transport;
