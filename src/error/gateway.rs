use alloy::transports::{RpcError, TransportErrorKind};

/// Type alias for `Result<T, GatewayError>`.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors returned by a [`ChainGateway`](crate::gateway::ChainGateway).
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// An error occurred talking to RPC.
    #[error(transparent)]
    Rpc(#[from] RpcError<TransportErrorKind>),
    /// The node returned data that could not be decoded.
    #[error(transparent)]
    Abi(#[from] alloy::sol_types::Error),
    /// The new block stream ended.
    #[error("block subscription closed")]
    SubscriptionClosed,
    /// Any other gateway failure.
    #[error("{0}")]
    Other(String),
}

impl GatewayError {
    /// Creates [`GatewayError::Other`] from any message.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
