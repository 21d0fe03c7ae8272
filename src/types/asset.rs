use crate::constants::NATIVE_DECIMALS;
use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Id under which the native coin of a chain is selected.
pub const NATIVE_ASSET_ID: &str = "native";

/// Token standard of an NFT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NftStandard {
    /// A non-fungible token following ERC-721.
    Erc721,
    /// A multi-token following ERC-1155.
    Erc1155,
}

impl fmt::Display for NftStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Erc721 => f.write_str("erc721"),
            Self::Erc1155 => f.write_str("erc1155"),
        }
    }
}

impl FromStr for NftStandard {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "erc721" => Ok(Self::Erc721),
            "erc1155" => Ok(Self::Erc1155),
            other => Err(format!("unknown token standard: {other}")),
        }
    }
}

/// The asset being transferred.
///
/// The kind is fixed when the asset is selected and never inferred from an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Asset {
    /// The chain's native coin.
    Native {
        /// Ticker of the coin, e.g. `ETH`.
        symbol: String,
    },
    /// A fungible ERC-20 token.
    Token {
        /// Token contract.
        address: Address,
        /// Number of decimals of the token.
        decimals: u8,
        /// Ticker of the token.
        symbol: String,
    },
    /// A single NFT.
    Nft {
        /// NFT contract.
        contract: Address,
        /// Id of the token within the contract.
        #[serde(rename = "tokenId")]
        token_id: U256,
        /// Token standard implemented by the contract.
        standard: NftStandard,
    },
}

impl Asset {
    /// Creates the native coin asset.
    pub fn native(symbol: impl Into<String>) -> Self {
        Self::Native { symbol: symbol.into() }
    }

    /// Creates a fungible token asset.
    pub fn token(address: Address, decimals: u8, symbol: impl Into<String>) -> Self {
        Self::Token { address, decimals, symbol: symbol.into() }
    }

    /// Creates an NFT asset.
    pub fn nft(contract: Address, token_id: U256, standard: NftStandard) -> Self {
        Self::Nft { contract, token_id, standard }
    }

    /// Identifier used to select this asset from an account's asset list.
    pub fn id(&self) -> String {
        match self {
            Self::Native { .. } => NATIVE_ASSET_ID.to_string(),
            Self::Token { address, .. } => address.to_checksum(None),
            Self::Nft { contract, token_id, .. } => format!("{}:{token_id}", contract.to_checksum(None)),
        }
    }

    /// Whether the given identifier selects this asset. Comparison is case-insensitive.
    pub fn matches_id(&self, id: &str) -> bool {
        self.id().eq_ignore_ascii_case(id.trim())
    }

    /// Number of decimals of one unit. NFTs are indivisible.
    pub const fn decimals(&self) -> u8 {
        match self {
            Self::Native { .. } => NATIVE_DECIMALS,
            Self::Token { decimals, .. } => *decimals,
            Self::Nft { .. } => 0,
        }
    }

    /// Ticker of the asset, if it has one.
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Self::Native { symbol } | Self::Token { symbol, .. } => Some(symbol),
            Self::Nft { .. } => None,
        }
    }

    /// Whether this is the chain's native coin.
    pub const fn is_native(&self) -> bool {
        matches!(self, Self::Native { .. })
    }

    /// Whether this is an NFT.
    pub const fn is_nft(&self) -> bool {
        matches!(self, Self::Nft { .. })
    }
}
