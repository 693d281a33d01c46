use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, eyre};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::infra::simulated::SimulatedChain;

/// Name of the in-process simulated network.
pub const SIM_NETWORK: &str = "sim";

/// Get the data directory for the application.
pub fn get_data_dir() -> PathBuf {
    if let Ok(s) = std::env::var("ETHDASH_DATA") {
        PathBuf::from(s)
    } else if let Some(proj_dirs) = ProjectDirs::from("com", "ethdash", "ethdash") {
        proj_dirs.data_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".data")
    }
}

/// Get the config directory for the application.
pub fn get_config_dir() -> PathBuf {
    if let Ok(s) = std::env::var("ETHDASH_CONFIG") {
        PathBuf::from(s)
    } else if let Some(proj_dirs) = ProjectDirs::from("com", "ethdash", "ethdash") {
        proj_dirs.config_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".config")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub name: String,
    pub rpc_url: String,
    pub request_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Config::devnet().network
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Seconds between poll passes over pending transactions.
    pub poll_interval_secs: u64,
    /// Blocks required on top of a receipt's block before it is final.
    pub min_confirmations: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            min_confirmations: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Milliseconds between provider polls for blocks and wallet changes.
    pub poll_interval_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 4000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub chain_id: u64,
    /// Seconds between automatically mined blocks.
    pub block_time_secs: u64,
    /// Starting balance of the simulated account, in ether.
    pub initial_balance: String,
    pub account: String,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            chain_id: SimulatedChain::DEFAULT_CHAIN_ID,
            block_time_secs: 3,
            initial_balance: "100".to_string(),
            account: "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Seconds a notification stays visible.
    pub notification_secs: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            notification_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub network: NetworkConfig,
    pub tracker: TrackerConfig,
    pub watcher: WatcherConfig,
    pub sim: SimConfig,
    pub ui: UiConfig,
}

impl Config {
    /// Create config for a named network, with an optional RPC override.
    pub fn new(network: &str, rpc_url: Option<&str>) -> Self {
        let mut config = Self::from_network(network);
        if let Some(url) = rpc_url {
            config.network.rpc_url = url.to_string();
        }
        config
    }

    /// Load `config.json` from the config directory if present, then apply
    /// the network selection on top.
    pub fn load(network: Option<&str>, rpc_url: Option<&str>) -> Result<Self> {
        Self::load_from(&get_config_dir().join("config.json"), network, rpc_url)
    }

    pub fn load_from(path: &Path, network: Option<&str>, rpc_url: Option<&str>) -> Result<Self> {
        let mut config = if path.exists() {
            info!("Loading config from {}", path.display());
            let text = std::fs::read_to_string(path)?;
            serde_json::from_str(&text)
                .map_err(|e| eyre!("Invalid config file {}: {}", path.display(), e))?
        } else {
            Self::default()
        };

        if let Some(name) = network {
            config.network = Self::from_network(name).network;
        }
        if let Some(url) = rpc_url {
            config.network.rpc_url = url.to_string();
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tracker.poll_interval_secs == 0 {
            return Err(eyre!("tracker.poll_interval_secs must be greater than 0"));
        }
        if self.tracker.min_confirmations == 0 {
            return Err(eyre!("tracker.min_confirmations must be at least 1"));
        }
        if self.watcher.poll_interval_ms == 0 {
            return Err(eyre!("watcher.poll_interval_ms must be greater than 0"));
        }
        if self.is_simulated() && self.sim.block_time_secs == 0 {
            return Err(eyre!("sim.block_time_secs must be greater than 0"));
        }
        Ok(())
    }

    pub fn is_simulated(&self) -> bool {
        self.network.name == SIM_NETWORK
    }

    pub fn devnet() -> Self {
        Self::with_network("devnet", "http://127.0.0.1:8545")
    }

    pub fn sepolia() -> Self {
        Self::with_network("sepolia", "https://rpc.sepolia.org")
    }

    pub fn mainnet() -> Self {
        Self::with_network("mainnet", "https://eth.llamarpc.com")
    }

    pub fn simulated() -> Self {
        Self::with_network(SIM_NETWORK, "")
    }

    fn with_network(name: &str, rpc_url: &str) -> Self {
        Self {
            network: NetworkConfig {
                name: name.to_string(),
                rpc_url: rpc_url.to_string(),
                request_timeout_secs: 30,
            },
            tracker: TrackerConfig::default(),
            watcher: WatcherConfig::default(),
            sim: SimConfig::default(),
            ui: UiConfig::default(),
        }
    }

    pub fn from_network(network: &str) -> Self {
        match network {
            "mainnet" => Self::mainnet(),
            "sepolia" => Self::sepolia(),
            SIM_NETWORK => Self::simulated(),
            _ => Self::devnet(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_network() {
        assert_eq!(Config::from_network("mainnet").network.name, "mainnet");
        assert_eq!(Config::from_network("sim").network.name, "sim");
        assert_eq!(Config::from_network("unknown").network.name, "devnet");
        assert!(Config::from_network("sim").is_simulated());
    }

    #[test]
    fn test_rpc_override() {
        let config = Config::new("sepolia", Some("http://localhost:9999"));
        assert_eq!(config.network.name, "sepolia");
        assert_eq!(config.network.rpc_url, "http://localhost:9999");
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.network.name, "devnet");
        assert_eq!(config.tracker.poll_interval_secs, 10);
        assert_eq!(config.tracker.min_confirmations, 1);
        assert_eq!(config.watcher.poll_interval_ms, 4000);
        assert_eq!(config.ui.notification_secs, 5);
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"tracker": {"min_confirmations": 3}, "network": {"name": "sepolia", "rpc_url": "http://node:8545"}}"#,
        )
        .unwrap();

        let config = Config::load_from(&path, None, None).unwrap();
        assert_eq!(config.tracker.min_confirmations, 3);
        assert_eq!(config.tracker.poll_interval_secs, 10);
        assert_eq!(config.network.rpc_url, "http://node:8545");
        assert_eq!(config.network.request_timeout_secs, 30);

        let config = Config::load_from(&path, Some("mainnet"), None).unwrap();
        assert_eq!(config.network.name, "mainnet");
        assert_eq!(config.tracker.min_confirmations, 3);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("nope.json"), Some("sim"), None).unwrap();
        assert!(config.is_simulated());
    }

    #[test]
    fn test_load_rejects_invalid() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"tracker": {"poll_interval_secs": 0}}"#).unwrap();
        assert!(Config::load_from(&path, None, None).is_err());

        std::fs::write(&path, r#"{"tracker": {"min_confirmations": 0}}"#).unwrap();
        let err = Config::load_from(&path, None, None).unwrap_err();
        assert!(err.to_string().contains("min_confirmations must be at least 1"));

        std::fs::write(&path, "not json").unwrap();
        assert!(Config::load_from(&path, None, None).is_err());
    }
}
