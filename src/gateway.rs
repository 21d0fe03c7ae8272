//! The per-chain RPC capability used by the transfer engine.

use crate::{
    error::GatewayResult,
    types::{Asset, IERC20, IERC721, IERC1155, NftStandard},
};
use alloy::{
    primitives::{Address, B256, Bytes, ChainId, U256},
    rpc::types::TransactionRequest,
    sol_types::SolCall,
};
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use std::{fmt::Debug, future::Future};

/// Stream of new block hashes. Dropping the stream releases the subscription.
pub type BlockStream = BoxStream<'static, B256>;

/// Access to a single chain.
///
/// Implementations own their transport. The engine never cancels calls; it discards results
/// that were superseded while in flight.
#[async_trait]
pub trait ChainGateway: Debug + Send + Sync {
    /// The chain this gateway talks to.
    fn chain_id(&self) -> ChainId;

    /// Resolves a human-readable name. Returns `Ok(None)` if the name is not registered.
    async fn resolve_name(&self, name: &str) -> GatewayResult<Option<Address>>;

    /// Estimates the gas used by a call.
    async fn estimate_gas(&self, tx: TransactionRequest) -> GatewayResult<u64>;

    /// Executes a read-only call against the latest state.
    async fn call(&self, tx: TransactionRequest) -> GatewayResult<Bytes>;

    /// Native balance of an address, in wei.
    async fn get_balance(&self, address: Address) -> GatewayResult<U256>;

    /// Transaction count of an address including pending transactions.
    async fn get_pending_nonce(&self, address: Address) -> GatewayResult<u64>;

    /// Subscribes to new blocks.
    async fn subscribe_blocks(&self) -> GatewayResult<BlockStream>;
}

/// Extension trait for [`ChainGateway`] adding token balance queries.
pub trait ChainGatewayExt: ChainGateway {
    /// Balance of an ERC-20 token held by `owner`, in base units.
    fn token_balance(
        &self,
        token: Address,
        owner: Address,
    ) -> impl Future<Output = GatewayResult<U256>> + Send {
        async move {
            let ret = self
                .call(
                    TransactionRequest::default()
                        .to(token)
                        .input(IERC20::balanceOfCall { owner }.abi_encode().into()),
                )
                .await?;
            Ok(IERC20::balanceOfCall::abi_decode_returns(&ret)?)
        }
    }

    /// Number of units of an NFT held by `owner`. Always 0 or 1 for ERC-721.
    fn nft_balance(
        &self,
        contract: Address,
        token_id: U256,
        standard: NftStandard,
        owner: Address,
    ) -> impl Future<Output = GatewayResult<U256>> + Send {
        async move {
            match standard {
                NftStandard::Erc721 => {
                    let ret = self
                        .call(
                            TransactionRequest::default()
                                .to(contract)
                                .input(IERC721::ownerOfCall { tokenId: token_id }.abi_encode().into()),
                        )
                        .await?;
                    let holder = IERC721::ownerOfCall::abi_decode_returns(&ret)?;
                    Ok(if holder == owner { U256::from(1) } else { U256::ZERO })
                }
                NftStandard::Erc1155 => {
                    let ret = self
                        .call(TransactionRequest::default().to(contract).input(
                            IERC1155::balanceOfCall { account: owner, id: token_id }
                                .abi_encode()
                                .into(),
                        ))
                        .await?;
                    Ok(IERC1155::balanceOfCall::abi_decode_returns(&ret)?)
                }
            }
        }
    }

    /// Balance of any asset held by `owner`, in base units.
    fn asset_balance(
        &self,
        asset: &Asset,
        owner: Address,
    ) -> impl Future<Output = GatewayResult<U256>> + Send {
        async move {
            match asset {
                Asset::Native { .. } => self.get_balance(owner).await,
                Asset::Token { address, .. } => self.token_balance(*address, owner).await,
                Asset::Nft { contract, token_id, standard } => {
                    self.nft_balance(*contract, *token_id, *standard, owner).await
                }
            }
        }
    }
}

impl<T> ChainGatewayExt for T where T: ChainGateway + ?Sized {}
