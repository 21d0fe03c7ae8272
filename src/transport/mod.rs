//! Transport layers for chain providers.

use crate::config::RpcConfig;
use alloy::{
    primitives::ChainId,
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::client::ClientBuilder,
    transports::layers::RetryBackoffLayer,
};
use url::Url;

mod timeout;
pub use timeout::{TimeoutLayer, TimeoutService};

/// Builds a provider for `chain_id` with retries and a per-request deadline.
///
/// The compute-units-per-second budget of the retry layer is set to the max value to avoid
/// any client-side throttling.
pub fn connect_http(endpoint: Url, chain_id: ChainId, config: &RpcConfig) -> DynProvider {
    let client = ClientBuilder::default()
        .layer(RetryBackoffLayer::new(config.max_retries, config.backoff_ms, u64::MAX))
        .layer(TimeoutLayer::new(config.timeout, chain_id))
        .http(endpoint);
    ProviderBuilder::new().connect_client(client).erased()
}
