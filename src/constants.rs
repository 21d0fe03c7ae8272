//! Transfer engine constants.

use alloy::primitives::{Address, address};

/// Gas used by a plain value transfer. Also the lower bound of an acceptable gas limit.
pub const NATIVE_TRANSFER_GAS: u64 = 21_000;

/// Gas limit used for a fungible token transfer when the node refuses to estimate it.
pub const TOKEN_TRANSFER_FALLBACK_GAS: u64 = 150_000;

/// Gas limit used for an ERC-1155 transfer when the node refuses to estimate it.
pub const ERC1155_TRANSFER_FALLBACK_GAS: u64 = 100_000;

/// Multiplier applied to fungible token transfer estimates.
///
/// Some RPC backends under-estimate token transfers, so the estimate is doubled.
pub const TOKEN_GAS_MULTIPLIER: u64 = 2;

/// Exclusive upper bound of an acceptable gas limit.
pub const MAX_GAS_LIMIT: u64 = 12_500_000;

/// Largest gas price, in gwei, that is accepted.
///
/// `9_007_199 * 10^9` stays below 2^53, so the fee stays exact even for consumers that hold
/// wei values in floating point.
pub const MAX_GAS_PRICE_GWEI: u64 = 9_007_199;

/// Number of wei in one gwei.
pub const WEI_PER_GWEI: u64 = 1_000_000_000;

/// Number of decimals of a gwei amount expressed in wei.
pub const GWEI_DECIMALS: u8 = 9;

/// Number of decimals of every native coin on supported chains.
pub const NATIVE_DECIMALS: u8 = 18;

/// Placeholder recipient used to estimate a token transfer before the recipient is known.
pub const PLACEHOLDER_RECIPIENT: Address = address!("D1b05E3AFEDcb11F29c5A560D098170bE26Fe5f5");

/// The ENS registry, deployed at the same address on mainnet and the Ethereum testnets.
///
/// See also <https://docs.ens.domains/learn/deployments>
pub const ENS_REGISTRY: Address = address!("00000000000C2E074eC69A0dFb2997BA6C7d2e1e");

/// Key under which the recent recipient list is persisted.
pub const RECIPIENTS_KEY: &str = "recipients";

/// Default number of retries for chain RPC requests.
pub const DEFAULT_RPC_MAX_RETRIES: u32 = 10;

/// Default initial backoff for chain RPC retries, in milliseconds.
pub const DEFAULT_RPC_BACKOFF_MS: u64 = 800;

/// Default timeout for a single chain RPC request, in seconds.
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 15;
