use super::validity::{DerivedFields, derive};
use crate::{
    types::{Asset, FeeTier, GasTiers, RecentRecipient},
    units::parse_amount,
};
use alloy::primitives::{Address, ChainId, U256};
use serde::Serialize;

/// The mutable parameters of one pending transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferState {
    /// Chain the transfer is prepared for.
    pub chain_id: ChainId,
    /// Whether the chain prices transactions with EIP-1559 fields.
    pub eip1559: bool,
    /// The sending account. Fixed for the session.
    pub sender: Address,
    /// The asset being transferred.
    pub asset: Asset,
    /// Raw recipient text entered by the user.
    pub recipient_input: String,
    /// The recipient address, once known.
    pub resolved_address: Option<Address>,
    /// Whether `resolved_address` came from a name resolution.
    pub is_name_resolution: bool,
    /// Raw amount text entered by the user.
    pub amount_text: String,
    /// `amount_text` in base units of the asset, `None` if it does not parse.
    pub amount: Option<U256>,
    /// Balance of the selected asset, in base units.
    pub asset_balance: U256,
    /// Native balance of the sender, in wei.
    pub native_balance: U256,
    /// Gas limit.
    pub gas_limit: u64,
    /// Why the last gas estimation failed, for transfers that do not fall back.
    pub gas_error: Option<String>,
    /// Selected fee tier.
    pub fee_tier: FeeTier,
    /// Latest tiers published by the fee feed, in wei.
    pub gas_tiers: GasTiers,
    /// Gas price in wei. The max fee per gas on EIP-1559 chains.
    pub gas_price: u128,
    /// Max priority fee per gas in wei. EIP-1559 chains only.
    pub priority_fee: u128,
    /// Nonce of the next transaction, once known.
    pub nonce: Option<u64>,
    /// Base fee of the next block in wei. Informational.
    pub next_block_base_fee: Option<u128>,
    /// Whether a name resolution is in flight.
    pub is_resolving_recipient: bool,
    /// Whether a gas estimation is in flight.
    pub is_estimating_gas: bool,
    /// Whether a send is in flight.
    pub is_sending: bool,
    /// Recipients sent to before, oldest first.
    pub recent_recipients: Vec<RecentRecipient>,
}

impl TransferState {
    /// A fresh transfer of `asset` from `sender` on `chain_id`.
    pub fn new(chain_id: ChainId, eip1559: bool, sender: Address, asset: Asset) -> Self {
        Self {
            chain_id,
            eip1559,
            sender,
            asset,
            recipient_input: String::new(),
            resolved_address: None,
            is_name_resolution: false,
            amount_text: String::new(),
            amount: None,
            asset_balance: U256::ZERO,
            native_balance: U256::ZERO,
            gas_limit: 0,
            gas_error: None,
            fee_tier: FeeTier::default(),
            gas_tiers: GasTiers::default(),
            gas_price: 0,
            priority_fee: 0,
            nonce: None,
            next_block_base_fee: None,
            is_resolving_recipient: false,
            is_estimating_gas: false,
            is_sending: false,
            recent_recipients: Vec::new(),
        }
    }

    /// Sets the amount text and re-derives the base units from it.
    pub(crate) fn set_amount_text(&mut self, text: String) {
        self.amount_text = text;
        self.rederive_amount();
    }

    /// Re-derives the base units from the amount text and the asset decimals.
    pub(crate) fn rederive_amount(&mut self) {
        self.amount = parse_amount(&self.amount_text, self.asset.decimals()).ok();
    }

    /// Applies the feed price of the selected tier. No-op for [`FeeTier::Custom`].
    pub(crate) fn apply_tier_price(&mut self) {
        if let Some(price) = self.gas_tiers.price(self.fee_tier) {
            self.gas_price = price;
        }
    }

    /// Appends `name` to the recent recipients unless already present, ignoring case.
    ///
    /// Returns whether the list changed.
    pub(crate) fn remember_recipient(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.recent_recipients.iter().any(|r| r.matches(name)) {
            return false;
        }
        self.recent_recipients.push(RecentRecipient::new(name));
        true
    }
}

/// A transfer state together with its derived fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferSnapshot {
    /// The state.
    pub state: TransferState,
    /// Fields derived from the state.
    pub derived: DerivedFields,
}

impl TransferSnapshot {
    /// Derives the fields of `state`.
    pub fn new(state: TransferState) -> Self {
        let derived = derive(&state);
        Self { state, derived }
    }
}
