use crate::{
    constants::{
        ERC1155_TRANSFER_FALLBACK_GAS, NATIVE_TRANSFER_GAS, PLACEHOLDER_RECIPIENT,
        TOKEN_GAS_MULTIPLIER, TOKEN_TRANSFER_FALLBACK_GAS,
    },
    error::GatewayResult,
    gateway::ChainGateway,
    types::{Asset, IERC20, IERC721, IERC1155, NftStandard},
};
use alloy::{
    primitives::{Address, Bytes, U256},
    rpc::types::TransactionRequest,
    sol_types::SolCall,
};
use tracing::{debug, instrument};

/// Outcome of a gas estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasEstimate {
    /// The chain estimated the transfer.
    Estimated(u64),
    /// The chain could not estimate the transfer and a fixed limit is used.
    Fallback(u64),
}

impl GasEstimate {
    /// The gas limit to use.
    pub const fn gas(&self) -> u64 {
        match self {
            Self::Estimated(gas) | Self::Fallback(gas) => *gas,
        }
    }

    /// Whether the estimate is a fixed fallback.
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// Estimates the gas limit of transfers sent by one account.
#[derive(Debug, Clone, Copy)]
pub struct GasEstimator<'a> {
    gateway: &'a dyn ChainGateway,
    sender: Address,
}

impl<'a> GasEstimator<'a> {
    /// Creates an estimator for transfers from `sender`.
    pub fn new(gateway: &'a dyn ChainGateway, sender: Address) -> Self {
        Self { gateway, sender }
    }

    /// Estimates the gas limit of transferring `amount` of `asset` to `recipient`.
    ///
    /// Returns an error only for ERC-721 transfers.
    #[instrument(skip_all, fields(chain_id = self.gateway.chain_id(), asset = %asset.id()))]
    pub async fn estimate(
        &self,
        asset: &Asset,
        recipient: Option<Address>,
        amount: U256,
    ) -> GatewayResult<GasEstimate> {
        match asset {
            Asset::Native { .. } => Ok(self.native(recipient).await),
            Asset::Token { address, .. } => Ok(self.token(*address, recipient, amount).await),
            Asset::Nft { contract, token_id, standard: NftStandard::Erc721 } => {
                self.erc721(*contract, *token_id, recipient).await
            }
            Asset::Nft { contract, token_id, standard: NftStandard::Erc1155 } => {
                Ok(self.erc1155(*contract, *token_id, recipient).await)
            }
        }
    }

    async fn native(&self, recipient: Option<Address>) -> GasEstimate {
        let Some(recipient) = recipient else {
            return GasEstimate::Fallback(NATIVE_TRANSFER_GAS);
        };

        let tx = TransactionRequest::default().from(self.sender).to(recipient).value(U256::from(1));
        match self.gateway.estimate_gas(tx).await {
            Ok(gas) => GasEstimate::Estimated(gas),
            Err(err) => {
                debug!(%err, "Native transfer estimation failed, using minimum");
                GasEstimate::Fallback(NATIVE_TRANSFER_GAS)
            }
        }
    }

    async fn token(&self, token: Address, recipient: Option<Address>, amount: U256) -> GasEstimate {
        let input = IERC20::transferFromCall {
            from: self.sender,
            to: recipient.unwrap_or(PLACEHOLDER_RECIPIENT),
            amount,
        }
        .abi_encode();

        match self.gateway.estimate_gas(self.contract_call(token, input.into())).await {
            Ok(gas) => GasEstimate::Estimated(gas.saturating_mul(TOKEN_GAS_MULTIPLIER)),
            Err(err) => {
                debug!(%err, "Token transfer estimation failed, using fallback");
                GasEstimate::Fallback(TOKEN_TRANSFER_FALLBACK_GAS)
            }
        }
    }

    async fn erc721(
        &self,
        contract: Address,
        token_id: U256,
        recipient: Option<Address>,
    ) -> GatewayResult<GasEstimate> {
        let input = IERC721::transferFromCall {
            from: self.sender,
            to: recipient.unwrap_or(PLACEHOLDER_RECIPIENT),
            tokenId: token_id,
        }
        .abi_encode();

        let gas = self.gateway.estimate_gas(self.contract_call(contract, input.into())).await?;
        Ok(GasEstimate::Estimated(gas))
    }

    async fn erc1155(
        &self,
        contract: Address,
        token_id: U256,
        recipient: Option<Address>,
    ) -> GasEstimate {
        let input = IERC1155::safeTransferFromCall {
            from: self.sender,
            to: recipient.unwrap_or(PLACEHOLDER_RECIPIENT),
            id: token_id,
            amount: U256::from(1),
            data: Bytes::new(),
        }
        .abi_encode();

        match self.gateway.estimate_gas(self.contract_call(contract, input.into())).await {
            Ok(gas) => GasEstimate::Estimated(gas),
            Err(err) => {
                debug!(%err, "ERC-1155 transfer estimation failed, using fallback");
                GasEstimate::Fallback(ERC1155_TRANSFER_FALLBACK_GAS)
            }
        }
    }

    fn contract_call(&self, to: Address, input: Bytes) -> TransactionRequest {
        TransactionRequest::default().from(self.sender).to(to).input(input.into())
    }
}
