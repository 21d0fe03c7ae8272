//! The boundary to the process that signs and broadcasts transfers.
//!
//! The engine never holds key material. It hands a fully specified [`TransferRequest`] across
//! this boundary and does not wait for a signature or a transaction hash.

use crate::types::TransferRequest;
use async_trait::async_trait;
use std::fmt::Debug;
use tokio::sync::mpsc;

/// Errors returned by a [`SigningBoundary`].
#[derive(Debug, thiserror::Error)]
pub enum BoundaryError {
    /// The signing process is not listening anymore.
    #[error("signing boundary is closed")]
    Closed,
    /// The signing process refused the request.
    #[error("signing boundary rejected the request: {0}")]
    Rejected(String),
}

/// A process that signs and broadcasts transfer requests.
#[async_trait]
pub trait SigningBoundary: Debug + Send + Sync {
    /// Hands a request over. Returns once the request was accepted for processing.
    async fn request_transfer(&self, request: TransferRequest) -> Result<(), BoundaryError>;
}

/// A [`SigningBoundary`] forwarding requests over a channel.
#[derive(Debug, Clone)]
pub struct ChannelBoundary {
    tx: mpsc::UnboundedSender<TransferRequest>,
}

impl ChannelBoundary {
    /// Creates a boundary and the receiving half owned by the signing process.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TransferRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl SigningBoundary for ChannelBoundary {
    async fn request_transfer(&self, request: TransferRequest) -> Result<(), BoundaryError> {
        self.tx.send(request).map_err(|_| BoundaryError::Closed)
    }
}
