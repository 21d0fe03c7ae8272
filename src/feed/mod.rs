//! Live gas price feeds.

mod constant;
pub use constant::ConstantFeed;
mod fee_history;
pub use fee_history::FeeHistoryFeed;

use crate::types::GasTiers;
use alloy::primitives::ChainId;
use async_trait::async_trait;
use std::fmt::Debug;
use tokio::sync::watch;

/// A source of gas price tiers per chain.
#[async_trait]
pub trait FeeFeed: Debug + Send + Sync {
    /// Subscribes to the tiers of a chain.
    ///
    /// The receiver holds [`GasTiers::default`] until the first update. Dropping it releases the
    /// subscription.
    fn subscribe(&self, chain_id: ChainId) -> watch::Receiver<GasTiers>;

    /// Base fee of the next block in wei, or `None` if the chain does not have one.
    async fn next_block_base_fee(&self, chain_id: ChainId) -> Option<u128>;
}
