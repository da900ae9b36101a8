use std::time::Duration;

use kaspa_addresses::{Address, Prefix};
use kaspa_consensus_core::network::NetworkType;
use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr};
use tracing::level_filters::LevelFilter;

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
pub struct BridgeConfig {
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default = "default_rust_log")]
    pub rust_log: LevelFilter,
    #[serde(default = "default_network_type")]
    pub network_type: NetworkType,
    pub kaspa_node_wborsh_url: Option<String>,
    /// Poll interval for block templates. Required; zero is rejected.
    pub block_wait_time_milliseconds: u64,
    pub redis_url: String,
    pub redis_channel: String,
    pub mining_address: String,
    #[serde(default = "default_miner_info")]
    pub miner_info: String,
    pub pool_tag: Option<String>,
    #[serde(default = "default_health_bind_address")]
    pub health_bind_address: String,
    #[serde(default = "default_probe_timeout_milliseconds")]
    pub probe_timeout_milliseconds: u64,
}

fn default_rust_log() -> LevelFilter {
    LevelFilter::INFO
}

fn default_network_type() -> NetworkType {
    NetworkType::Mainnet
}

fn default_miner_info() -> String {
    format!("bridge/{}", env!("CARGO_PKG_VERSION"))
}

fn default_health_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_probe_timeout_milliseconds() -> u64 {
    5_000
}

pub fn get_bridge_config() -> anyhow::Result<BridgeConfig> {
    let config = envy::from_env::<BridgeConfig>()?;
    config.validate()?;
    Ok(config)
}

impl BridgeConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.block_wait_time_milliseconds == 0 {
            anyhow::bail!("BLOCK_WAIT_TIME_MILLISECONDS must be a positive number of milliseconds");
        }
        self.mining_address()?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.block_wait_time_milliseconds)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_milliseconds)
    }

    /// Miner tag embedded in every template request as extra data:
    /// `miner_info`, with the pool tag appended when one is configured.
    pub fn miner_tag(&self) -> String {
        match self.pool_tag.as_deref().map(str::trim) {
            Some(tag) if !tag.is_empty() => format!("{}/{}", self.miner_info, tag),
            _ => self.miner_info.clone(),
        }
    }

    pub fn mining_address(&self) -> anyhow::Result<Address> {
        let address = Address::try_from(self.mining_address.as_str())
            .map_err(|err| anyhow::anyhow!("invalid mining address: {err}"))?;
        let expected = Prefix::from(self.network_type);
        if address.prefix != expected {
            anyhow::bail!(
                "mining address prefix {:?} does not match network {}",
                address.prefix,
                self.network_type
            );
        }
        Ok(address)
    }
}
