//! Transfer engine error types.
use alloy::primitives::ChainId;
use thiserror::Error;

mod gateway;
pub use gateway::{GatewayError, GatewayResult};

mod storage;
pub use storage::StorageError;

pub use crate::{signer::BoundaryError, transfer::InvalidReason, units::UnitsError};

/// The overarching error type returned by the transfer engine.
///
/// Name resolution and most gas estimation failures never end up here: they are recovered
/// inside the engine and only reflected in the derived validity of the transfer.
#[derive(Debug, Error)]
pub enum TransferError {
    /// An error occurred talking to the chain.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    /// The amount could not be converted.
    #[error(transparent)]
    Units(#[from] UnitsError),
    /// The recent recipient store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The signing boundary rejected the request.
    #[error(transparent)]
    Boundary(#[from] BoundaryError),
    /// The transfer cannot be submitted in its current state.
    #[error("transfer is not ready: {0}")]
    NotReady(InvalidReason),
    /// The native balance cannot cover the maximum fee.
    #[error("insufficient fee")]
    InsufficientFee,
    /// Gas estimation failed for a transfer that must not fall back to a constant.
    #[error("gas estimation failed: {0}")]
    GasEstimation(GatewayError),
    /// The chain is not supported.
    #[error("unsupported chain {0}")]
    UnsupportedChain(ChainId),
    /// A background engine task panicked or was cancelled.
    #[error("engine task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<InvalidReason> for TransferError {
    fn from(reason: InvalidReason) -> Self {
        match reason {
            InvalidReason::InsufficientFee => Self::InsufficientFee,
            reason => Self::NotReady(reason),
        }
    }
}
