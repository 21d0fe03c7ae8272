//! Builds the request handed to the signing boundary.

use super::{state::TransferState, validity::derive};
use crate::{
    error::{GatewayError, InvalidReason, TransferError},
    types::{
        Asset, FeeFields, IERC20, IERC721, IERC1155, NftStandard, RecipientLabel, TransferRequest,
        TransferToken,
    },
};
use alloy::{
    primitives::{Address, Bytes, U256, map::HashMap},
    sol_types::SolCall,
};
use tracing::debug;

/// Builds the transfer request described by `state`.
///
/// Fails if the state is not submittable. Native transfers whose amount plus the maximum fee
/// exceed the balance are reduced to the balance net of the fee.
pub(crate) fn assemble(
    state: &TransferState,
    contacts: &HashMap<Address, String>,
) -> Result<TransferRequest, TransferError> {
    if let Some(err) = &state.gas_error {
        return Err(TransferError::GasEstimation(GatewayError::other(err.clone())));
    }

    let derived = derive(state);
    if let Some(reason) = derived.invalid_reason {
        return Err(reason.into());
    }

    let recipient = state.resolved_address.ok_or(InvalidReason::NoRecipient)?;
    let nonce = state.nonce.ok_or(InvalidReason::MissingNonce)?;

    let (to, value, data) = match &state.asset {
        Asset::Native { .. } => {
            let amount = state.amount.ok_or(InvalidReason::InvalidAmount)?;
            (recipient, net_of_fee(amount, state.asset_balance, derived.max_fee)?, Bytes::new())
        }
        Asset::Token { address, .. } => {
            let data = IERC20::transferCall { to: recipient, amount: state.amount.unwrap_or_default() }
                .abi_encode();
            (*address, U256::ZERO, data.into())
        }
        Asset::Nft { contract, token_id, standard: NftStandard::Erc721 } => {
            let data =
                IERC721::transferFromCall { from: state.sender, to: recipient, tokenId: *token_id }
                    .abi_encode();
            (*contract, U256::ZERO, data.into())
        }
        Asset::Nft { contract, token_id, standard: NftStandard::Erc1155 } => {
            let data = IERC1155::safeTransferFromCall {
                from: state.sender,
                to: recipient,
                id: *token_id,
                amount: U256::from(1),
                data: Bytes::new(),
            }
            .abi_encode();
            (*contract, U256::ZERO, data.into())
        }
    };

    let fees = if state.eip1559 {
        FeeFields::Eip1559 {
            max_fee_per_gas: state.gas_price,
            max_priority_fee_per_gas: state.priority_fee,
        }
    } else {
        FeeFields::Legacy { gas_price: state.gas_price }
    };

    let name = if state.is_name_resolution {
        state.recipient_input.trim().to_string()
    } else {
        contacts.get(&recipient).cloned().unwrap_or_default()
    };

    let transfer_token = match &state.asset {
        Asset::Token { decimals, symbol, .. } => {
            Some(TransferToken { symbol: symbol.clone(), decimals: *decimals })
        }
        _ => None,
    };

    Ok(TransferRequest {
        chain_id: state.chain_id,
        from: state.sender,
        to,
        value,
        data,
        gas: state.gas_limit,
        nonce,
        fees,
        recipient: RecipientLabel { address: recipient, name },
        transfer_token,
    })
}

/// The native value to send: `amount`, or `balance - fee` if both do not fit into `balance`.
fn net_of_fee(amount: U256, balance: U256, fee: U256) -> Result<U256, TransferError> {
    if amount.saturating_add(fee) <= balance {
        return Ok(amount);
    }
    let value = balance.checked_sub(fee).ok_or(TransferError::InsufficientFee)?;
    debug!(%amount, %value, "Reducing value to balance net of fee");
    Ok(value)
}
