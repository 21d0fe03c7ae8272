//! Per-request deadline for chain RPC calls.

use alloy::{
    primitives::ChainId,
    rpc::json_rpc::{RequestPacket, ResponsePacket},
    transports::{Transport, TransportError, TransportErrorKind, TransportFut},
};
use futures_util::FutureExt;
use std::{
    task::{Context, Poll},
    time::Duration,
};
use tower::{Layer, Service};
use tracing::warn;

/// A [`tower::Layer`] that fails requests which do not complete within a deadline.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutLayer {
    deadline: Duration,
    chain_id: ChainId,
}

impl TimeoutLayer {
    /// Creates a layer failing requests on `chain_id` after `deadline`.
    pub const fn new(deadline: Duration, chain_id: ChainId) -> Self {
        Self { deadline, chain_id }
    }
}

impl<T> Layer<T> for TimeoutLayer {
    type Service = TimeoutService<T>;

    fn layer(&self, inner: T) -> Self::Service {
        TimeoutService { inner, deadline: self.deadline, chain_id: self.chain_id }
    }
}

/// Transport wrapped by [`TimeoutLayer`].
#[derive(Debug, Clone)]
pub struct TimeoutService<T> {
    inner: T,
    deadline: Duration,
    chain_id: ChainId,
}

impl<T> Service<RequestPacket> for TimeoutService<T>
where
    T: Transport + Clone,
{
    type Response = ResponsePacket;
    type Error = TransportError;
    type Future = TransportFut<'static>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: RequestPacket) -> Self::Future {
        let method = req.as_single().map(|r| r.method().to_string());
        let deadline = self.deadline;
        let chain_id = self.chain_id;
        let fut = self.inner.call(req);

        async move {
            tokio::time::timeout(deadline, fut).await.unwrap_or_else(|_| {
                let method = method.as_deref().unwrap_or("batch");
                warn!(chain_id, method, deadline_ms = deadline.as_millis() as u64, "RPC deadline exceeded");
                Err(TransportErrorKind::custom_str(&format!(
                    "{method} on chain {chain_id} exceeded {}ms",
                    deadline.as_millis()
                )))
            })
        }
        .boxed()
    }
}
