//! Transfer engine configuration.
use crate::constants::{DEFAULT_RPC_BACKOFF_MS, DEFAULT_RPC_MAX_RETRIES, DEFAULT_RPC_TIMEOUT_SECS};
use alloy::primitives::ChainId;
use alloy_chains::{Chain, NamedChain};
use eyre::Context;
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use url::Url;

/// Transfer engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Supported networks.
    #[serde(default = "default_networks")]
    pub networks: Vec<NetworkConfig>,
    /// Chain a session opens on when none is requested.
    #[serde(default = "default_chain")]
    pub default_chain: ChainId,
    /// Chain RPC settings.
    #[serde(default)]
    pub rpc: RpcConfig,
    /// Fee feed settings.
    #[serde(default)]
    pub feed: FeeFeedConfig,
    /// File the recent recipient list is persisted to.
    #[serde(default = "default_recipients_path")]
    pub recipients_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            networks: default_networks(),
            default_chain: default_chain(),
            rpc: RpcConfig::default(),
            feed: FeeFeedConfig::default(),
            recipients_path: default_recipients_path(),
        }
    }
}

impl EngineConfig {
    /// Sets the chain a session opens on.
    pub fn with_default_chain(mut self, chain_id: ChainId) -> Self {
        self.default_chain = chain_id;
        self
    }

    /// Sets the RPC endpoints of a network, keeping any already configured ones as fallbacks.
    pub fn with_endpoint(mut self, chain_id: ChainId, endpoint: Url) -> Self {
        if let Some(network) = self.networks.iter_mut().find(|n| n.chain.id() == chain_id) {
            network.endpoints.retain(|existing| existing != &endpoint);
            network.endpoints.insert(0, endpoint);
        }
        self
    }

    /// Sets the per-request RPC deadline.
    pub fn with_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc.timeout = timeout;
        self
    }

    /// Sets how often the fee feed polls.
    pub fn with_feed_interval(mut self, interval: Duration) -> Self {
        self.feed.poll_interval = interval;
        self
    }

    /// Sets the recent recipient file.
    pub fn with_recipients_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.recipients_path = path.into();
        self
    }

    /// Returns the network with the given chain id.
    pub fn network(&self, chain_id: ChainId) -> Option<&NetworkConfig> {
        self.networks.iter().find(|n| n.chain.id() == chain_id)
    }

    /// Load from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> eyre::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .wrap_err_with(|| format!("failed to read config file: {}", path.display()))?;
        let config = serde_yaml::from_reader(&file)
            .wrap_err_with(|| format!("failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Save to a YAML file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> eyre::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// A supported network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// The chain.
    pub chain: Chain,
    /// Display name.
    pub name: String,
    /// Ticker of the native coin.
    pub symbol: String,
    /// Whether transactions are priced with EIP-1559 fields.
    #[serde(default)]
    pub eip1559: bool,
    /// RPC endpoints, tried in order.
    #[serde(default)]
    pub endpoints: Vec<Url>,
    /// Whether this is a test network.
    #[serde(default)]
    pub test: bool,
}

impl NetworkConfig {
    fn new(chain: NamedChain, name: &str, symbol: &str, eip1559: bool, test: bool) -> Self {
        Self {
            chain: chain.into(),
            name: name.to_string(),
            symbol: symbol.to_string(),
            eip1559,
            endpoints: Vec::new(),
            test,
        }
    }

    /// The chain id.
    pub fn chain_id(&self) -> ChainId {
        self.chain.id()
    }
}

/// Chain RPC settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Deadline of a single request, in milliseconds.
    #[serde(with = "crate::serde::duration")]
    pub timeout: Duration,
    /// Maximum number of retries of rate limited requests.
    pub max_retries: u32,
    /// Initial retry backoff, in milliseconds.
    pub backoff_ms: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS),
            max_retries: DEFAULT_RPC_MAX_RETRIES,
            backoff_ms: DEFAULT_RPC_BACKOFF_MS,
        }
    }
}

/// Fee feed settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeFeedConfig {
    /// Time between two feed refreshes, in milliseconds.
    #[serde(with = "crate::serde::duration")]
    pub poll_interval: Duration,
    /// Number of past blocks sampled from the fee history.
    pub past_blocks: u64,
    /// Priority fee percentile of the rapid tier.
    pub rapid_percentile: f64,
    /// Priority fee percentile of the fast tier.
    pub fast_percentile: f64,
    /// Priority fee percentile of the standard tier.
    pub standard_percentile: f64,
}

impl Default for FeeFeedConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            past_blocks: 10,
            rapid_percentile: 90.0,
            fast_percentile: 60.0,
            standard_percentile: 30.0,
        }
    }
}

fn default_networks() -> Vec<NetworkConfig> {
    vec![
        NetworkConfig::new(NamedChain::Mainnet, "Ethereum", "ETH", true, false),
        NetworkConfig::new(NamedChain::Polygon, "Polygon", "MATIC", false, false),
        NetworkConfig::new(NamedChain::BinanceSmartChain, "BSC", "BNB", false, false),
        NetworkConfig::new(NamedChain::Gnosis, "xDAI", "xDAI", false, false),
        NetworkConfig::new(NamedChain::Fantom, "Fantom", "FTM", false, false),
        NetworkConfig::new(NamedChain::Ropsten, "Ropsten", "ETH", true, true),
        NetworkConfig::new(NamedChain::Rinkeby, "Rinkeby", "ETH", true, true),
        NetworkConfig::new(NamedChain::Goerli, "Goerli", "ETH", true, true),
        NetworkConfig::new(NamedChain::Kovan, "Kovan", "ETH", true, true),
    ]
}

const fn default_chain() -> ChainId {
    1
}

fn default_recipients_path() -> PathBuf {
    PathBuf::from("recipients.json")
}
