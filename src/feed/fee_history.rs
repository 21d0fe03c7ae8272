use super::FeeFeed;
use crate::{
    config::{FeeFeedConfig, NetworkConfig},
    error::{GatewayError, GatewayResult},
    spawn::TaskHandle,
    types::GasTiers,
};
use alloy::{
    eips::BlockNumberOrTag,
    primitives::{ChainId, map::HashMap},
    providers::{DynProvider, Provider},
};
use async_trait::async_trait;
use tokio::{sync::watch, time::interval};
use tracing::{debug, trace, warn};

/// Legacy tiers as a percentage of `eth_gasPrice`: rapid, fast, standard.
const LEGACY_TIER_PERCENTAGES: [u128; 3] = [120, 100, 90];

#[derive(Debug)]
struct ChainFeed {
    provider: DynProvider,
    eip1559: bool,
    tiers: watch::Receiver<GasTiers>,
    _task: TaskHandle,
}

/// A [`FeeFeed`] polling each chain's node.
///
/// EIP-1559 chains derive their tiers from `eth_feeHistory` reward percentiles on top of twice
/// the next block base fee. Legacy chains scale `eth_gasPrice`. Polling stops once the feed is
/// dropped.
#[derive(Debug)]
pub struct FeeHistoryFeed {
    chains: HashMap<ChainId, ChainFeed>,
}

impl FeeHistoryFeed {
    /// Spawns one polling task per network.
    pub fn spawn(
        networks: impl IntoIterator<Item = (NetworkConfig, DynProvider)>,
        config: FeeFeedConfig,
    ) -> Self {
        let chains = networks
            .into_iter()
            .map(|(network, provider)| {
                let chain_id = network.chain_id();
                let (tx, rx) = watch::channel(GasTiers::default());
                let task = TaskHandle::spawn(poll(
                    provider.clone(),
                    chain_id,
                    network.eip1559,
                    config.clone(),
                    tx,
                ));
                (chain_id, ChainFeed { provider, eip1559: network.eip1559, tiers: rx, _task: task })
            })
            .collect();
        Self { chains }
    }
}

#[async_trait]
impl FeeFeed for FeeHistoryFeed {
    fn subscribe(&self, chain_id: ChainId) -> watch::Receiver<GasTiers> {
        match self.chains.get(&chain_id) {
            Some(chain) => chain.tiers.clone(),
            None => {
                warn!(chain_id, "No fee feed for chain");
                watch::channel(GasTiers::default()).1
            }
        }
    }

    async fn next_block_base_fee(&self, chain_id: ChainId) -> Option<u128> {
        let chain = self.chains.get(&chain_id).filter(|chain| chain.eip1559)?;
        match chain.provider.get_fee_history(1, BlockNumberOrTag::Latest, &[]).await {
            Ok(history) => history.next_block_base_fee(),
            Err(err) => {
                debug!(chain_id, %err, "Failed to fetch next block base fee");
                None
            }
        }
    }
}

async fn poll(
    provider: DynProvider,
    chain_id: ChainId,
    eip1559: bool,
    config: FeeFeedConfig,
    tx: watch::Sender<GasTiers>,
) {
    let mut interval = interval(config.poll_interval);
    loop {
        interval.tick().await;
        match fetch_tiers(&provider, eip1559, &config).await {
            Ok(tiers) => {
                trace!(chain_id, ?tiers, "Gas tiers update");
                tx.send_replace(tiers);
            }
            Err(err) => warn!(chain_id, %err, "Failed to refresh gas tiers"),
        }
    }
}

async fn fetch_tiers(
    provider: &DynProvider,
    eip1559: bool,
    config: &FeeFeedConfig,
) -> GatewayResult<GasTiers> {
    if eip1559 {
        let history = provider
            .get_fee_history(
                config.past_blocks,
                BlockNumberOrTag::Latest,
                &[config.rapid_percentile, config.fast_percentile, config.standard_percentile],
            )
            .await?;
        let base_fee = history
            .next_block_base_fee()
            .ok_or_else(|| GatewayError::other("no base fee in fee history"))?;
        Ok(eip1559_tiers(base_fee, history.reward.as_deref().unwrap_or_default()))
    } else {
        Ok(legacy_tiers(provider.get_gas_price().await?))
    }
}

/// Max fee per tier: twice the next base fee plus the mean reward at the tier's percentile.
fn eip1559_tiers(next_base_fee: u128, rewards: &[Vec<u128>]) -> GasTiers {
    let tier = |index: usize| {
        let (sum, count) = rewards
            .iter()
            .filter_map(|block| block.get(index))
            .fold((0u128, 0u128), |(sum, count), reward| (sum.saturating_add(*reward), count + 1));
        let tip = if count == 0 { 0 } else { sum / count };
        next_base_fee.saturating_mul(2).saturating_add(tip)
    };
    GasTiers::new(tier(0), tier(1), tier(2))
}

fn legacy_tiers(gas_price: u128) -> GasTiers {
    let [rapid, fast, standard] =
        LEGACY_TIER_PERCENTAGES.map(|pct| gas_price.saturating_mul(pct) / 100);
    GasTiers::new(rapid, fast, standard)
}
