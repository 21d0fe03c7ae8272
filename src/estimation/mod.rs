//! Gas estimation per transfer kind.
//!
//! Every kind asks the chain for an estimate first. When the node refuses, native, fungible and
//! ERC-1155 transfers fall back to a fixed gas limit. ERC-721 transfers never fall back: an
//! underestimated NFT transfer forfeits the fee without moving the token.

mod gas;
pub use gas::{GasEstimate, GasEstimator};
