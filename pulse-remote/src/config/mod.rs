use config::builder::DefaultState;
use config::{File, FileFormat, Source};
use serde::{Deserialize, Serialize};

use pulse_core::config::ColdStartConfig;

use crate::config::transport::UdpTransport;
use crate::REFERENCE;

pub mod transport;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Cadence of the beacon broadcast and the liveness report, in
    /// milliseconds.
    pub poll_interval_millis: u64,
    pub transport: UdpTransport,
    pub failure_detector: ColdStartConfig,
}

impl RemoteConfig {
    pub fn builder() -> RemoteConfigBuilder {
        RemoteConfigBuilder::default()
    }
}

pub struct RemoteConfigBuilder {
    builder: config::ConfigBuilder<DefaultState>,
}

impl Default for RemoteConfigBuilder {
    fn default() -> Self {
        // the embedded reference goes in first so every later source
        // overrides it
        let builder =
            config::Config::builder().add_source(File::from_str(REFERENCE, FileFormat::Toml));
        Self { builder }
    }
}

impl RemoteConfigBuilder {
    pub fn add_source<T>(self, source: T) -> Self
    where
        T: Source + Send + Sync + 'static,
    {
        Self {
            builder: self.builder.add_source(source),
        }
    }

    pub fn build(self) -> anyhow::Result<RemoteConfig> {
        let remote_config = self.builder.build()?.try_deserialize::<RemoteConfig>()?;
        Ok(remote_config)
    }
}
