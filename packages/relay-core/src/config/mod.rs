use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use crate::Error;

pub const MUMBAI_CHAIN_ID: u64 = 80001;
pub const SEPOLIA_CHAIN_ID: u64 = 11155111;

const DEFAULT_SIGNER_KEY_ENV: &str = "PKEY";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ChainConfig {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub rpc_url: Option<String>,
    #[serde(default)]
    pub bridge_address: Option<String>,
    /// Chain that receives the `accept` call for events observed here.
    pub counterpart: u64,
    /// Human-readable ABI overriding the default bridge interface.
    #[serde(default)]
    pub abi: Option<Vec<String>>,
}

impl ChainConfig {
    pub fn rpc_url(&self) -> Result<&str, Error> {
        self.rpc_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| self.missing("RPC URL"))
    }

    pub fn bridge_address(&self) -> Result<&str, Error> {
        let address = self
            .bridge_address
            .as_deref()
            .filter(|addr| !addr.trim().is_empty())
            .ok_or_else(|| self.missing("bridge contract address"))?;

        match hex::decode(address.trim_start_matches("0x")) {
            Ok(bytes) if bytes.len() == 20 => Ok(address),
            _ => Err(Error::Config(format!(
                "Invalid bridge contract address for chain {}: {}",
                self.id, address
            ))),
        }
    }

    fn missing(&self, what: &str) -> Error {
        Error::Config(format!("Missing {} for chain {} ({})", what, self.id, self.name))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RelayerConfig {
    #[serde(default = "default_gas_price_gwei")]
    pub gas_price_gwei: u64,
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    #[serde(default = "default_confirmations")]
    pub confirmations: usize,
    /// Seconds to wait for `confirmations` blocks.
    #[serde(default = "default_confirmation_timeout")]
    pub confirmation_timeout: u64,
    /// Log polling interval in milliseconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
    /// Seconds before a failed log watcher is opened again.
    #[serde(default = "default_resubscribe_delay")]
    pub resubscribe_delay: u64,
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

fn default_gas_price_gwei() -> u64 {
    20
}

fn default_gas_limit() -> u64 {
    300_000
}

fn default_confirmations() -> usize {
    1
}

fn default_confirmation_timeout() -> u64 {
    300
}

fn default_poll_interval() -> u64 {
    4_000
}

fn default_resubscribe_delay() -> u64 {
    5
}

fn default_max_in_flight() -> usize {
    16
}

impl Default for RelayerConfig {
    fn default() -> Self {
        Self {
            gas_price_gwei: default_gas_price_gwei(),
            gas_limit: default_gas_limit(),
            confirmations: default_confirmations(),
            confirmation_timeout: default_confirmation_timeout(),
            poll_interval: default_poll_interval(),
            resubscribe_delay: default_resubscribe_delay(),
            max_in_flight: default_max_in_flight(),
        }
    }
}

impl RelayerConfig {
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval)
    }

    pub fn resubscribe_delay(&self) -> Duration {
        Duration::from_secs(self.resubscribe_delay)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    pub chains: Vec<ChainConfig>,
    #[serde(default)]
    pub relayer: RelayerConfig,
    /// Environment variable holding the shared signer key.
    #[serde(default = "default_signer_key_env")]
    pub signer_key_env: String,
}

fn default_signer_key_env() -> String {
    DEFAULT_SIGNER_KEY_ENV.to_string()
}

impl Config {
    /// Loads a JSON config file, or TOML when the file ends in `.toml`.
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self, Error> {
        let config_path = config_path.as_ref();
        let config_str = std::fs::read_to_string(config_path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = match config_path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&config_str)
                .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?,
            _ => serde_json::from_str(&config_str)
                .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?,
        };

        config.validate()?;

        Ok(config)
    }

    /// The two-chain Mumbai/Sepolia deployment, read from `MUMBAI`, `SEPOLIA`,
    /// `CON_MUMBAI` and `CON_SEPOLIA` (a `.env` file is honoured).
    pub fn from_env() -> Result<Self, Error> {
        dotenvy::dotenv().ok();

        let var = |name: &str| std::env::var(name).ok();
        let config = Config {
            chains: vec![
                ChainConfig {
                    id: MUMBAI_CHAIN_ID,
                    name: "Polygon Mumbai".to_string(),
                    rpc_url: var("MUMBAI"),
                    bridge_address: var("CON_MUMBAI"),
                    counterpart: SEPOLIA_CHAIN_ID,
                    abi: None,
                },
                ChainConfig {
                    id: SEPOLIA_CHAIN_ID,
                    name: "Ethereum Sepolia".to_string(),
                    rpc_url: var("SEPOLIA"),
                    bridge_address: var("CON_SEPOLIA"),
                    counterpart: MUMBAI_CHAIN_ID,
                    abi: None,
                },
            ],
            relayer: RelayerConfig::default(),
            signer_key_env: default_signer_key_env(),
        };

        config.validate()?;

        Ok(config)
    }

    /// Structural checks only. Missing endpoint parameters are reported per
    /// chain when its endpoint is built, so one bad chain does not stop the rest.
    pub fn validate(&self) -> Result<(), Error> {
        if self.chains.is_empty() {
            return Err(Error::Config("At least one chain must be configured".to_string()));
        }

        let mut seen = HashSet::new();
        for chain in &self.chains {
            if !seen.insert(chain.id) {
                return Err(Error::Config(format!("Duplicate chain ID: {}", chain.id)));
            }
            if chain.counterpart == chain.id {
                return Err(Error::Config(format!(
                    "Chain {} cannot relay to itself",
                    chain.id
                )));
            }
        }

        if self.relayer.gas_limit == 0 {
            return Err(Error::Config("Relayer gas limit must be greater than 0".to_string()));
        }
        if self.relayer.confirmations == 0 {
            return Err(Error::Config("Relayer confirmations must be greater than 0".to_string()));
        }
        if self.relayer.confirmation_timeout == 0 {
            return Err(Error::Config(
                "Relayer confirmation timeout must be greater than 0".to_string(),
            ));
        }
        if self.relayer.max_in_flight == 0 {
            return Err(Error::Config("Relayer max in-flight must be greater than 0".to_string()));
        }

        Ok(())
    }

    pub fn get_chain_config(&self, chain_id: u64) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.id == chain_id)
    }

    pub fn signer_key(&self) -> Result<String, Error> {
        std::env::var(&self.signer_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(format!("Missing signer key (set {})", self.signer_key_env))
            })
    }
}
