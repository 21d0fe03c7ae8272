//! Transfer engine metrics.

use alloy::primitives::ChainId;
use metrics::{Counter, Histogram};
use metrics_derive::Metrics;

/// Metrics of a [`TransferEngine`](crate::transfer::TransferEngine) session.
#[derive(Metrics, Clone)]
#[metrics(scope = "transfer")]
pub struct TransferMetrics {
    /// Number of name resolutions issued.
    pub resolutions: Counter,
    /// Number of name resolutions that failed or found nothing.
    pub resolution_failures: Counter,
    /// Time it takes to resolve a name, in milliseconds.
    pub resolution_latency: Histogram,
    /// Number of gas estimations issued.
    pub gas_estimates: Counter,
    /// Number of gas estimations that fell back to a fixed limit.
    pub gas_estimate_fallbacks: Counter,
    /// Number of responses discarded because a newer request superseded them.
    pub stale_responses: Counter,
    /// Number of requests handed to the signing boundary.
    pub submitted: Counter,
    /// Number of requests the signing boundary failed to accept.
    pub boundary_failures: Counter,
}

impl TransferMetrics {
    /// Metrics labelled with the chain of the session.
    pub fn for_chain(chain_id: ChainId) -> Self {
        Self::new_with_labels(&[("chain_id", chain_id.to_string())])
    }
}
