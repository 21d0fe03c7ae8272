//! Derived validity of a pending transfer.
//!
//! Everything here is a pure function of [`TransferState`] and is recomputed after every
//! mutation.

use super::state::TransferState;
use crate::{
    constants::{MAX_GAS_LIMIT, NATIVE_TRANSFER_GAS},
    units::{is_sane_gas_price, max_fee_wei},
};
use alloy::primitives::U256;
use serde::Serialize;
use std::fmt;

/// Why a transfer cannot be submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum InvalidReason {
    /// The selected asset balance is zero.
    NoBalance,
    /// The recipient is empty or did not resolve.
    NoRecipient,
    /// No amount was entered.
    MissingAmount,
    /// The amount is not a valid decimal number.
    InvalidAmount,
    /// The amount exceeds the selected asset balance.
    AmountExceedsBalance,
    /// The sender does not hold the NFT.
    NotOwner,
    /// The gas limit of the current transfer is still being estimated.
    EstimatingGas,
    /// Gas estimation failed for a transfer that has no fallback.
    GasEstimationFailed,
    /// The gas limit is outside the accepted range.
    GasLimitOutOfRange,
    /// The nonce is not known yet.
    MissingNonce,
    /// A send is already in flight.
    Sending,
    /// No priority fee was entered on an EIP-1559 chain.
    MissingPriorityFee,
    /// The gas price is zero or above the accepted ceiling.
    GasPriceOutOfRange,
    /// The native balance cannot cover the maximum fee.
    InsufficientFee,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoBalance => "no balance",
            Self::NoRecipient => "no valid recipient",
            Self::MissingAmount => "missing amount",
            Self::InvalidAmount => "invalid amount",
            Self::AmountExceedsBalance => "amount exceeds balance",
            Self::NotOwner => "token not owned by sender",
            Self::EstimatingGas => "estimating gas",
            Self::GasEstimationFailed => "gas estimation failed",
            Self::GasLimitOutOfRange => "gas limit out of range",
            Self::MissingNonce => "missing nonce",
            Self::Sending => "already sending",
            Self::MissingPriorityFee => "missing priority fee",
            Self::GasPriceOutOfRange => "gas price out of range",
            Self::InsufficientFee => "insufficient fee",
        })
    }
}

/// Fields derived from a [`TransferState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedFields {
    /// Whether the transfer is structurally and economically valid.
    pub is_valid: bool,
    /// Whether the native balance cannot cover the maximum fee. Independent of `is_valid`.
    pub insufficient_fee: bool,
    /// First reason the transfer cannot be submitted, if any.
    pub invalid_reason: Option<InvalidReason>,
    /// Maximum fee in wei: gas price times gas limit.
    pub max_fee: U256,
}

impl DerivedFields {
    /// Whether the transfer can be handed to the signing boundary.
    pub const fn can_submit(&self) -> bool {
        self.invalid_reason.is_none()
    }
}

/// Derives the validity fields of `state`.
pub fn derive(state: &TransferState) -> DerivedFields {
    let max_fee = max_fee_wei(state.gas_price, state.gas_limit);
    let insufficient_fee = state.native_balance < max_fee;
    let validity = if state.asset.is_nft() { check_nft(state) } else { check(state) };

    let invalid_reason = match validity {
        Err(reason) => Some(reason),
        Ok(()) if insufficient_fee => Some(InvalidReason::InsufficientFee),
        Ok(()) => None,
    };

    DerivedFields { is_valid: validity.is_ok(), insufficient_fee, invalid_reason, max_fee }
}

/// Validity of a native or fungible token transfer.
fn check(state: &TransferState) -> Result<(), InvalidReason> {
    if state.asset_balance.is_zero() {
        return Err(InvalidReason::NoBalance);
    }
    check_recipient(state)?;

    if state.amount_text.trim().is_empty() {
        return Err(InvalidReason::MissingAmount);
    }
    let amount = state.amount.ok_or(InvalidReason::InvalidAmount)?;
    if amount > state.asset_balance {
        return Err(InvalidReason::AmountExceedsBalance);
    }

    check_gas_limit(state)?;
    check_nonce(state)?;
    check_pricing(state)
}

/// Validity of an NFT transfer. Insufficient fee invalidates NFT transfers.
fn check_nft(state: &TransferState) -> Result<(), InvalidReason> {
    check_recipient(state)?;
    if state.native_balance < max_fee_wei(state.gas_price, state.gas_limit) {
        return Err(InvalidReason::InsufficientFee);
    }
    check_gas_limit(state)?;
    if state.asset_balance.is_zero() {
        return Err(InvalidReason::NotOwner);
    }
    check_nonce(state)?;
    check_pricing(state)
}

fn check_recipient(state: &TransferState) -> Result<(), InvalidReason> {
    if state.resolved_address.is_none() || state.recipient_input.trim().is_empty() {
        return Err(InvalidReason::NoRecipient);
    }
    Ok(())
}

fn check_gas_limit(state: &TransferState) -> Result<(), InvalidReason> {
    if state.is_estimating_gas {
        return Err(InvalidReason::EstimatingGas);
    }
    if state.gas_error.is_some() {
        return Err(InvalidReason::GasEstimationFailed);
    }
    if !(NATIVE_TRANSFER_GAS..MAX_GAS_LIMIT).contains(&state.gas_limit) {
        return Err(InvalidReason::GasLimitOutOfRange);
    }
    Ok(())
}

fn check_nonce(state: &TransferState) -> Result<(), InvalidReason> {
    if state.nonce.is_none() {
        return Err(InvalidReason::MissingNonce);
    }
    if state.is_sending {
        return Err(InvalidReason::Sending);
    }
    Ok(())
}

fn check_pricing(state: &TransferState) -> Result<(), InvalidReason> {
    if state.eip1559 && state.priority_fee == 0 {
        return Err(InvalidReason::MissingPriorityFee);
    }
    if !is_sane_gas_price(state.gas_price) {
        return Err(InvalidReason::GasPriceOutOfRange);
    }
    Ok(())
}
