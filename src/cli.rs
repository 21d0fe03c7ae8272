//! # Transfer engine CLI
use crate::{
    chains::Networks,
    config::EngineConfig,
    feed::{ConstantFeed, FeeFeed, FeeHistoryFeed},
    provider::ProviderGateway,
    signer::{ChannelBoundary, SigningBoundary},
    storage::RecipientStore,
    transfer::{SendOutcome, Services, Session, TransferEngine},
    types::{Asset, FeeTier, GasTiers, NftStandard},
    units::{format_gwei, parse_gwei},
};
use alloy::primitives::{Address, ChainId, U256};
use clap::Parser;
use eyre::{Context, OptionExt};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::{debug, info, warn};
use url::Url;

/// Prepares a transfer from an account and optionally hands it to a signer.
///
/// The prepared transfer is printed as JSON. With `--send`, the signing request is printed as
/// well.
#[derive(Debug, Parser)]
#[command(author, about = "Transfer engine", long_about = None)]
pub struct Args {
    /// The configuration file.
    ///
    /// If missing, a default one will be used and stored in the working directory under
    /// `transfer.yaml`.
    #[arg(long, value_name = "CONFIG", env = "TRANSFER_CONFIG", default_value = "transfer.yaml")]
    pub config: PathBuf,
    /// The sending account.
    #[arg(long, value_name = "ADDRESS")]
    pub from: Address,
    /// The chain to prepare the transfer on. Defaults to the configured default chain.
    #[arg(long, value_name = "CHAIN_ID")]
    pub chain: Option<ChainId>,
    /// An RPC endpoint for the selected chain. Takes precedence over configured endpoints.
    #[arg(long = "endpoint", value_name = "RPC_ENDPOINT")]
    pub endpoints: Vec<Url>,
    /// The recipient: an address or a name.
    #[arg(long, value_name = "RECIPIENT")]
    pub to: Option<String>,
    /// The amount in human units, e.g. `1.5`.
    #[arg(long, value_name = "AMOUNT")]
    pub amount: Option<String>,
    /// Transfer an ERC-20 token instead of the native coin.
    #[arg(long, value_name = "ADDRESS", conflicts_with = "nft")]
    pub token: Option<Address>,
    /// Decimals of the ERC-20 token.
    #[arg(long, value_name = "DECIMALS", default_value_t = 18, requires = "token")]
    pub decimals: u8,
    /// Ticker of the ERC-20 token.
    #[arg(long, value_name = "SYMBOL", default_value = "TOKEN", requires = "token")]
    pub symbol: String,
    /// Transfer an NFT held in this contract.
    #[arg(long, value_name = "ADDRESS", requires = "token_id")]
    pub nft: Option<Address>,
    /// Id of the NFT.
    #[arg(long = "token-id", value_name = "ID", requires = "nft")]
    pub token_id: Option<U256>,
    /// Token standard of the NFT contract.
    #[arg(long, value_name = "STANDARD", default_value = "erc721", requires = "nft")]
    pub standard: NftStandard,
    /// The fee tier.
    #[arg(long, value_name = "TIER", default_value = "fast")]
    pub tier: FeeTier,
    /// A custom gas price in gwei. Selects the custom tier.
    #[arg(long = "gas-price", value_name = "GWEI")]
    pub gas_price: Option<String>,
    /// The priority fee in gwei, on EIP-1559 chains.
    #[arg(long = "priority-fee", value_name = "GWEI")]
    pub priority_fee: Option<String>,
    /// Overrides the gas limit.
    #[arg(long = "gas-limit", value_name = "GAS")]
    pub gas_limit: Option<u64>,
    /// Overrides the nonce.
    #[arg(long, value_name = "NONCE")]
    pub nonce: Option<u64>,
    /// Serve fixed gas prices instead of polling the chain, in gwei.
    #[arg(long = "fixed-fees", value_name = "GWEI")]
    pub fixed_fees: Option<String>,
    /// How long to wait for the first gas prices.
    #[arg(long = "fee-wait", value_name = "SECONDS", value_parser = parse_duration_secs, default_value = "10")]
    pub fee_wait: Duration,
    /// Hand the transfer to the signer.
    #[arg(long, default_value_t = false)]
    pub send: bool,
}

impl Args {
    /// Prepares the transfer.
    pub async fn run(self) -> eyre::Result<()> {
        let config = if self.config.exists() {
            EngineConfig::load_from_file(&self.config)?
        } else {
            let config = EngineConfig::default();
            config.save_to_file(&self.config)?;
            config
        };
        let chain_id = self.chain.unwrap_or(config.default_chain);
        let config = self
            .endpoints
            .iter()
            .rev()
            .fold(config, |config, endpoint| config.with_endpoint(chain_id, endpoint.clone()));

        let (boundary, mut requests) = ChannelBoundary::new();
        let services = self.services(&config, Arc::new(boundary))?;

        let mut session = Session::new(self.from, chain_id);
        if let Some(asset) = self.asset() {
            session = session.with_asset(asset);
        }
        let engine = TransferEngine::open(services, session).await?;
        if self.fixed_fees.is_none() {
            wait_for_fees(&engine, self.fee_wait).await;
        }

        engine.set_fee_tier(self.tier).await;
        if let Some(price) = &self.gas_price {
            engine.set_gas_price(price).await?;
        }
        if let Some(fee) = &self.priority_fee {
            engine.set_priority_fee(fee).await?;
        }
        if let Some(amount) = &self.amount {
            engine.set_amount(amount.as_str()).await;
        }
        if let Some(to) = &self.to {
            engine.set_recipient(to.as_str()).await;
        }
        if let Some(gas_limit) = self.gas_limit {
            engine.set_gas_limit(gas_limit).await;
        }
        if let Some(nonce) = self.nonce {
            engine.set_nonce(nonce).await;
        }

        let snapshot = engine.snapshot();
        info!(
            asset = snapshot.state.asset.symbol().unwrap_or("NFT"),
            tier = %snapshot.state.fee_tier,
            gas_price_gwei = %format_gwei(snapshot.state.gas_price),
            gas_limit = snapshot.state.gas_limit,
            "Prepared transfer"
        );
        println!("{}", serde_json::to_string_pretty(&snapshot)?);

        if self.send {
            match engine.send_transfer().await? {
                SendOutcome::Submitted(_) => {
                    let request =
                        requests.recv().await.ok_or_eyre("signing request was not delivered")?;
                    info!(to = %request.to, nonce = request.nonce, "Transfer handed to signer");
                    println!("{}", serde_json::to_string_pretty(&request)?);
                }
                SendOutcome::AlreadySending => warn!("A transfer is already being sent"),
            }
        } else if let Some(reason) = snapshot.derived.invalid_reason {
            info!(%reason, "Transfer is not ready");
        }

        engine.dispose().await;
        Ok(())
    }

    /// Connects every network with an endpoint and sets up the fee feed and recipient store.
    fn services(
        &self,
        config: &EngineConfig,
        boundary: Arc<dyn SigningBoundary>,
    ) -> eyre::Result<Services> {
        let mut networks = Networks::default();
        let mut providers = Vec::new();
        for network in config.networks.iter().filter(|n| !n.endpoints.is_empty()) {
            let gateway = ProviderGateway::connect(network, &config.rpc)
                .wrap_err_with(|| format!("failed to connect to {}", network.name))?;
            providers.push((network.clone(), gateway.provider().clone()));
            networks = networks.with_network(network.clone(), Arc::new(gateway));
        }
        if networks.is_empty() {
            eyre::bail!("no network has an RPC endpoint, pass one with --endpoint");
        }
        debug!(chains = ?networks.chain_ids_iter().collect::<Vec<_>>(), "Connected networks");

        let feed: Arc<dyn FeeFeed> = match &self.fixed_fees {
            Some(gwei) => {
                let price = parse_gwei(gwei)?;
                Arc::new(ConstantFeed::new(GasTiers::new(price, price, price)))
            }
            None => Arc::new(FeeHistoryFeed::spawn(providers, config.feed.clone())),
        };

        Ok(Services {
            networks,
            feed,
            store: RecipientStore::file(&config.recipients_path),
            boundary,
        })
    }

    fn asset(&self) -> Option<Asset> {
        if let Some(token) = self.token {
            return Some(Asset::token(token, self.decimals, self.symbol.clone()));
        }
        Some(Asset::nft(self.nft?, self.token_id?, self.standard))
    }
}

/// Waits until the fee feed published its first tiers, or `timeout` elapsed.
async fn wait_for_fees(engine: &TransferEngine, timeout: Duration) {
    let mut snapshots = engine.subscribe();
    let published = snapshots.wait_for(|snapshot| snapshot.state.gas_tiers != GasTiers::default());
    if tokio::time::timeout(timeout, published).await.is_err() {
        warn!(?timeout, "No gas prices received");
    }
}

/// Parses a string representing seconds to a [`Duration`].
fn parse_duration_secs(arg: &str) -> Result<Duration, std::num::ParseIntError> {
    let seconds = arg.parse()?;
    Ok(Duration::from_secs(seconds))
}
