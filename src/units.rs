//! Exact conversions between human-entered amounts and base units, and fee arithmetic.
//!
//! Amounts are never routed through floating point. Fractional digits beyond the token's
//! decimals are truncated, never rounded up.

use crate::constants::{GWEI_DECIMALS, MAX_GAS_PRICE_GWEI, WEI_PER_GWEI};
use alloy::primitives::{
    U256,
    utils::{UnitsError as AlloyUnitsError, format_units, parse_units},
};

/// Errors returned by amount conversions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitsError {
    /// The amount is empty.
    #[error("amount is empty")]
    Empty,
    /// The amount is not a plain decimal number.
    #[error("invalid amount: {0}")]
    Malformed(String),
    /// The amount is negative.
    #[error("amount must not be negative")]
    Negative,
    /// The amount does not fit into 256 bits.
    #[error("amount is too large")]
    Overflow,
    /// The number of decimals is not supported.
    #[error("unsupported number of decimals: {0}")]
    Decimals(u8),
}

impl From<AlloyUnitsError> for UnitsError {
    fn from(err: AlloyUnitsError) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// Parses a decimal string into base units of a token with `decimals` decimals.
///
/// Digits past `decimals` are dropped. `"1.0000019"` with 6 decimals is `1_000_001`.
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, UnitsError> {
    if decimals > 77 {
        return Err(UnitsError::Decimals(decimals));
    }

    let amount = amount.trim();
    if amount.is_empty() {
        return Err(UnitsError::Empty);
    }
    if amount.starts_with('-') {
        return Err(UnitsError::Negative);
    }

    let (int, frac) = amount.split_once('.').unwrap_or((amount, ""));
    let well_formed = !(int.is_empty() && frac.is_empty())
        && int.bytes().all(|b| b.is_ascii_digit())
        && frac.bytes().all(|b| b.is_ascii_digit());
    if !well_formed {
        return Err(UnitsError::Malformed(amount.to_string()));
    }

    let frac = &frac[..frac.len().min(decimals as usize)];
    let int = if int.is_empty() { "0" } else { int };
    let normalized = if frac.is_empty() { int.to_string() } else { format!("{int}.{frac}") };

    // A value that overflows is reported by alloy as a generic parse error.
    if int.trim_start_matches('0').len() + decimals as usize > 78 {
        return Err(UnitsError::Overflow);
    }

    Ok(parse_units(&normalized, decimals)?.get_absolute())
}

/// Formats base units of a token with `decimals` decimals as a decimal string.
///
/// Trailing fractional zeros are trimmed: `1_500_000` with 6 decimals is `"1.5"`.
pub fn format_amount(amount: U256, decimals: u8) -> Result<String, UnitsError> {
    if decimals > 77 {
        return Err(UnitsError::Decimals(decimals));
    }
    let formatted = format_units(amount, decimals)?;
    Ok(match formatted.split_once('.') {
        Some((int, frac)) => {
            let frac = frac.trim_end_matches('0');
            if frac.is_empty() { int.to_string() } else { format!("{int}.{frac}") }
        }
        None => formatted,
    })
}

/// Parses a gwei amount into wei. Digits below one wei are dropped.
pub fn parse_gwei(gwei: &str) -> Result<u128, UnitsError> {
    let wei = parse_amount(gwei, GWEI_DECIMALS)?;
    u128::try_from(wei).map_err(|_| UnitsError::Overflow)
}

/// Formats wei as gwei: `1_500_000_000` is `"1.5"`.
pub fn format_gwei(wei: u128) -> String {
    let unit = u128::from(WEI_PER_GWEI);
    let (int, frac) = (wei / unit, wei % unit);
    if frac == 0 {
        return int.to_string();
    }
    let frac = format!("{frac:09}");
    format!("{int}.{}", frac.trim_end_matches('0'))
}

/// Whether a gas price in wei is strictly positive and at most [`MAX_GAS_PRICE_GWEI`].
pub fn is_sane_gas_price(wei: u128) -> bool {
    wei > 0 && wei <= u128::from(MAX_GAS_PRICE_GWEI) * u128::from(WEI_PER_GWEI)
}

/// Maximum fee, in wei, for a transaction priced at `gas_price` wei with `gas_limit`.
pub fn max_fee_wei(gas_price: u128, gas_limit: u64) -> U256 {
    U256::from(gas_price) * U256::from(gas_limit)
}
