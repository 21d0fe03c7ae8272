use super::FeeFeed;
use crate::types::GasTiers;
use alloy::primitives::ChainId;
use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::watch;

#[derive(Debug)]
struct ChainTiers {
    tiers: watch::Sender<GasTiers>,
    base_fee: Option<u128>,
}

/// A [`FeeFeed`] serving fixed tiers, updated only by hand.
#[derive(Debug)]
pub struct ConstantFeed {
    initial: GasTiers,
    chains: DashMap<ChainId, ChainTiers>,
}

impl ConstantFeed {
    /// Creates a feed serving `tiers` on every chain.
    pub fn new(tiers: GasTiers) -> Self {
        Self { initial: tiers, chains: DashMap::new() }
    }

    /// Returns [`Self`] with a next block base fee on `chain_id`.
    pub fn with_base_fee(self, chain_id: ChainId, base_fee: u128) -> Self {
        self.set_base_fee(chain_id, Some(base_fee));
        self
    }

    /// Publishes new tiers for `chain_id` to all subscribers.
    pub fn set_tiers(&self, chain_id: ChainId, tiers: GasTiers) {
        self.chain(chain_id).tiers.send_replace(tiers);
    }

    /// Sets the next block base fee of `chain_id`.
    pub fn set_base_fee(&self, chain_id: ChainId, base_fee: Option<u128>) {
        self.chain(chain_id).base_fee = base_fee;
    }

    /// Number of live subscribers on `chain_id`.
    pub fn subscriber_count(&self, chain_id: ChainId) -> usize {
        self.chains.get(&chain_id).map_or(0, |chain| chain.tiers.receiver_count())
    }

    fn chain(&self, chain_id: ChainId) -> dashmap::mapref::one::RefMut<'_, ChainId, ChainTiers> {
        self.chains.entry(chain_id).or_insert_with(|| ChainTiers {
            tiers: watch::channel(self.initial).0,
            base_fee: None,
        })
    }
}

#[async_trait]
impl FeeFeed for ConstantFeed {
    fn subscribe(&self, chain_id: ChainId) -> watch::Receiver<GasTiers> {
        self.chain(chain_id).tiers.subscribe()
    }

    async fn next_block_base_fee(&self, chain_id: ChainId) -> Option<u128> {
        self.chains.get(&chain_id).and_then(|chain| chain.base_fee)
    }
}
