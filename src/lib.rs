//! # Transfer engine
//!
//! Prepares native coin, ERC-20, ERC-721 and ERC-1155 transfers for an EVM wallet.
//!
//! A [`TransferEngine`](transfer::TransferEngine) resolves the recipient, estimates gas, tracks
//! gas price tiers and balances, and reports whether the transfer can be submitted. A finished
//! transfer is handed to a [`SigningBoundary`](signer::SigningBoundary); the engine never signs.

pub mod chains;
pub mod cli;
pub mod config;
pub mod constants;
pub mod ens;
pub mod error;
pub mod estimation;
pub mod feed;
pub mod gateway;
pub mod metrics;
pub mod provider;
pub mod serde;
pub mod signer;
pub mod spawn;
pub mod storage;
pub mod transfer;
pub mod transport;
pub mod types;
pub mod units;
