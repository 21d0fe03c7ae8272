use alloy::{
    primitives::{Address, Bytes, ChainId, U256},
    rpc::types::TransactionRequest,
};
use serde::{Deserialize, Serialize};

/// Fee fields of a transfer. Exactly one pricing model is ever set.
///
/// Serialized flat into the request as `gasPrice`, or `maxFeePerGas` and
/// `maxPriorityFeePerGas`, as hex quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeeFields {
    /// EIP-1559 pricing.
    #[serde(rename_all = "camelCase")]
    Eip1559 {
        /// Max fee per gas in wei.
        #[serde(with = "alloy::serde::quantity")]
        max_fee_per_gas: u128,
        /// Max priority fee per gas in wei.
        #[serde(with = "alloy::serde::quantity")]
        max_priority_fee_per_gas: u128,
    },
    /// Legacy pricing.
    #[serde(rename_all = "camelCase")]
    Legacy {
        /// Gas price in wei.
        #[serde(with = "alloy::serde::quantity")]
        gas_price: u128,
    },
}

impl FeeFields {
    /// The highest price per gas the transfer may pay, in wei.
    pub const fn max_price_per_gas(&self) -> u128 {
        match self {
            Self::Legacy { gas_price } => *gas_price,
            Self::Eip1559 { max_fee_per_gas, .. } => *max_fee_per_gas,
        }
    }
}

/// Human-readable recipient shown by the confirmation UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientLabel {
    /// The resolved recipient address.
    pub address: Address,
    /// The resolved name, a known contact name, or empty.
    pub name: String,
}

/// Display metadata of the fungible token being transferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferToken {
    /// Ticker of the token.
    pub symbol: String,
    /// Number of decimals of the token.
    pub decimals: u8,
}

/// A fully specified transfer handed to the signing boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    /// Chain the transfer is meant for.
    pub chain_id: ChainId,
    /// The sending account.
    pub from: Address,
    /// Call target: the recipient for native transfers, the contract otherwise.
    pub to: Address,
    /// Native value attached to the call.
    pub value: U256,
    /// Call data.
    pub data: Bytes,
    /// Gas limit.
    pub gas: u64,
    /// Nonce of the sending account.
    pub nonce: u64,
    /// Pricing.
    #[serde(flatten)]
    pub fees: FeeFields,
    /// Recipient shown to the user.
    pub recipient: RecipientLabel,
    /// Token metadata for fungible token transfers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_token: Option<TransferToken>,
}

impl TransferRequest {
    /// Maximum fee the transfer may pay, in wei.
    pub fn max_fee(&self) -> U256 {
        U256::from(self.fees.max_price_per_gas()) * U256::from(self.gas)
    }
}

impl From<&TransferRequest> for TransactionRequest {
    fn from(request: &TransferRequest) -> Self {
        let mut tx = Self::default()
            .from(request.from)
            .to(request.to)
            .value(request.value)
            .input(request.data.clone().into())
            .gas_limit(request.gas)
            .nonce(request.nonce);
        tx.chain_id = Some(request.chain_id);

        match request.fees {
            FeeFields::Legacy { gas_price } => tx.gas_price = Some(gas_price),
            FeeFields::Eip1559 { max_fee_per_gas, max_priority_fee_per_gas } => {
                tx.max_fee_per_gas = Some(max_fee_per_gas);
                tx.max_priority_fee_per_gas = Some(max_priority_fee_per_gas);
            }
        }
        tx
    }
}
