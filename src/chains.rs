//! A collection of gateways for different chains.

use crate::{config::NetworkConfig, error::TransferError, gateway::ChainGateway};
use alloy::primitives::{ChainId, map::HashMap};
use std::sync::Arc;

/// A single supported network.
#[derive(Debug, Clone)]
pub struct Network {
    /// Static network settings.
    pub config: NetworkConfig,
    /// Gateway to the chain.
    pub gateway: Arc<dyn ChainGateway>,
}

impl Network {
    /// The chain id.
    pub fn chain_id(&self) -> ChainId {
        self.config.chain_id()
    }

    /// Whether transactions on this network carry EIP-1559 fee fields.
    pub fn is_eip1559(&self) -> bool {
        self.config.eip1559
    }
}

/// A collection of gateways for different chains.
#[derive(Debug, Clone, Default)]
pub struct Networks {
    networks: HashMap<ChainId, Network>,
}

impl Networks {
    /// Adds a network, replacing any previous one with the same chain id.
    pub fn with_network(mut self, config: NetworkConfig, gateway: Arc<dyn ChainGateway>) -> Self {
        self.networks.insert(config.chain_id(), Network { config, gateway });
        self
    }

    /// Get a network for a given chain ID.
    pub fn get(&self, chain_id: ChainId) -> Result<Network, TransferError> {
        self.networks.get(&chain_id).cloned().ok_or(TransferError::UnsupportedChain(chain_id))
    }

    /// Get an iterator over the supported chain IDs.
    pub fn chain_ids_iter(&self) -> impl Iterator<Item = &ChainId> {
        self.networks.keys()
    }

    /// Whether no network is configured.
    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}
