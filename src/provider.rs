//! [`ChainGateway`] backed by an alloy provider.

use crate::{
    config::{NetworkConfig, RpcConfig},
    ens,
    error::{GatewayError, GatewayResult},
    gateway::{BlockStream, ChainGateway},
    transport::connect_http,
};
use alloy::{
    primitives::{Address, Bytes, ChainId, U256},
    providers::{DynProvider, Provider},
    rpc::types::TransactionRequest,
};
use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use tracing::{debug, instrument};

/// A [`ChainGateway`] over a JSON-RPC node.
#[derive(Debug, Clone)]
pub struct ProviderGateway {
    provider: DynProvider,
    chain_id: ChainId,
}

impl ProviderGateway {
    /// Wraps an existing provider for `chain_id`.
    pub fn new(provider: DynProvider, chain_id: ChainId) -> Self {
        Self { provider, chain_id }
    }

    /// Connects to the first endpoint of a network.
    pub fn connect(network: &NetworkConfig, rpc: &RpcConfig) -> GatewayResult<Self> {
        let chain_id = network.chain_id();
        let endpoint = network.endpoints.first().cloned().ok_or_else(|| {
            GatewayError::other(format!("no endpoint configured for chain {chain_id}"))
        })?;
        debug!(chain_id, %endpoint, "Connecting to chain");
        Ok(Self::new(connect_http(endpoint, chain_id, rpc), chain_id))
    }

    /// The underlying provider.
    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }
}

#[async_trait]
impl ChainGateway for ProviderGateway {
    fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    async fn resolve_name(&self, name: &str) -> GatewayResult<Option<Address>> {
        ens::resolve(&self.provider, name).await
    }

    async fn estimate_gas(&self, tx: TransactionRequest) -> GatewayResult<u64> {
        Ok(self.provider.estimate_gas(tx).await?)
    }

    async fn call(&self, tx: TransactionRequest) -> GatewayResult<Bytes> {
        Ok(self.provider.call(tx).await?)
    }

    async fn get_balance(&self, address: Address) -> GatewayResult<U256> {
        Ok(self.provider.get_balance(address).await?)
    }

    async fn get_pending_nonce(&self, address: Address) -> GatewayResult<u64> {
        Ok(self.provider.get_transaction_count(address).pending().await?)
    }

    #[instrument(skip(self), fields(chain_id = self.chain_id))]
    async fn subscribe_blocks(&self) -> GatewayResult<BlockStream> {
        let poller = self.provider.watch_blocks().await?;
        debug!("Watching new blocks");
        Ok(poller.into_stream().flat_map(stream::iter).boxed())
    }
}
