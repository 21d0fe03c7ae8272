//! Transfer engine test environment

use alloy::{
    primitives::{Address, B256, Bytes, ChainId, U256, address, map::HashMap},
    rpc::types::TransactionRequest,
    sol_types::{SolCall, SolValue},
};
use async_trait::async_trait;
use eyre::{OptionExt, WrapErr};
use futures_util::{StreamExt, stream};
use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use transfer_engine::{
    chains::Networks,
    config::EngineConfig,
    error::{BoundaryError, GatewayError, GatewayResult},
    feed::ConstantFeed,
    gateway::{BlockStream, ChainGateway},
    signer::SigningBoundary,
    storage::{InMemoryStorage, RecipientStore, StorageApi},
    transfer::{Services, Session, TransferEngine, TransferSnapshot},
    types::{Asset, GasTiers, IERC20, IERC721, IERC1155, RecentRecipient, TransferRequest},
};

pub const GWEI: u128 = 1_000_000_000;
pub const ETHER: u128 = GWEI * GWEI;

pub const MAINNET: ChainId = 1;
pub const POLYGON: ChainId = 137;

pub const SENDER: Address = address!("1111111111111111111111111111111111111111");
pub const ALICE: Address = address!("a11ce00000000000000000000000000000000000");
pub const BOB: Address = address!("b0b0000000000000000000000000000000000000");
pub const TOKEN: Address = address!("3333333333333333333333333333333333333333");
pub const COLLECTION: Address = address!("4444444444444444444444444444444444444444");

/// How long to wait for background updates.
const TIMEOUT: Duration = Duration::from_secs(5);

/// A chain answering from in-memory state.
#[derive(Debug)]
pub struct MockGateway {
    chain_id: ChainId,
    state: Mutex<MockState>,
    blocks: broadcast::Sender<B256>,
}

#[derive(Debug, Default)]
struct MockState {
    names: HashMap<String, Address>,
    held: HashMap<String, oneshot::Receiver<()>>,
    held_estimate: Option<oneshot::Receiver<()>>,
    fail_names: bool,
    gas: Option<u64>,
    native_balance: U256,
    token_balance: U256,
    nft_owner: Address,
    erc1155_balance: U256,
    nonce: u64,
    estimates: Vec<TransactionRequest>,
}

impl MockGateway {
    pub fn new(chain_id: ChainId) -> Self {
        Self {
            chain_id,
            state: Mutex::new(MockState { gas: Some(21_000), ..Default::default() }),
            blocks: broadcast::channel(16).0,
        }
    }

    pub fn with_name(&self, name: &str, address: Address) {
        self.state.lock().unwrap().names.insert(name.to_string(), address);
    }

    /// Holds resolutions of `name` until the returned sender fires or is dropped.
    pub fn hold(&self, name: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.state.lock().unwrap().held.insert(name.to_string(), rx);
        tx
    }

    /// Holds the next estimation of a contract call until the returned sender fires or is
    /// dropped.
    pub fn hold_contract_estimate(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.state.lock().unwrap().held_estimate = Some(rx);
        tx
    }

    /// Makes name resolution fail with an RPC error.
    pub fn fail_names(&self, fail: bool) {
        self.state.lock().unwrap().fail_names = fail;
    }

    /// Answers estimations with `gas`, or reverts if `None`.
    pub fn set_gas(&self, gas: Option<u64>) {
        self.state.lock().unwrap().gas = gas;
    }

    pub fn set_native_balance(&self, balance: U256) {
        self.state.lock().unwrap().native_balance = balance;
    }

    pub fn set_token_balance(&self, balance: U256) {
        self.state.lock().unwrap().token_balance = balance;
    }

    pub fn set_nft_owner(&self, owner: Address) {
        self.state.lock().unwrap().nft_owner = owner;
    }

    pub fn set_erc1155_balance(&self, balance: U256) {
        self.state.lock().unwrap().erc1155_balance = balance;
    }

    pub fn set_nonce(&self, nonce: u64) {
        self.state.lock().unwrap().nonce = nonce;
    }

    /// Estimation requests received so far.
    pub fn estimates(&self) -> Vec<TransactionRequest> {
        self.state.lock().unwrap().estimates.clone()
    }

    /// Announces a new block to all subscribers.
    pub fn mine_block(&self) {
        let _ = self.blocks.send(B256::ZERO);
    }

    pub fn block_subscribers(&self) -> usize {
        self.blocks.receiver_count()
    }
}

#[async_trait]
impl ChainGateway for MockGateway {
    fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    async fn resolve_name(&self, name: &str) -> GatewayResult<Option<Address>> {
        let held = self.state.lock().unwrap().held.remove(name);
        if let Some(release) = held {
            let _ = release.await;
        }
        let state = self.state.lock().unwrap();
        if state.fail_names {
            return Err(GatewayError::other("resolver unreachable"));
        }
        Ok(state.names.get(name).copied())
    }

    async fn estimate_gas(&self, tx: TransactionRequest) -> GatewayResult<u64> {
        let is_call = tx.input.input().is_some_and(|input| !input.is_empty());
        let held = {
            let mut state = self.state.lock().unwrap();
            state.estimates.push(tx);
            if is_call { state.held_estimate.take() } else { None }
        };
        if let Some(release) = held {
            let _ = release.await;
        }
        self.state.lock().unwrap().gas.ok_or_else(|| GatewayError::other("execution reverted"))
    }

    async fn call(&self, tx: TransactionRequest) -> GatewayResult<Bytes> {
        let input = tx.input.input().cloned().unwrap_or_default();
        let selector = input.get(..4).unwrap_or_default();
        let state = self.state.lock().unwrap();
        let ret = if selector == IERC20::balanceOfCall::SELECTOR {
            state.token_balance.abi_encode()
        } else if selector == IERC721::ownerOfCall::SELECTOR {
            state.nft_owner.abi_encode()
        } else if selector == IERC1155::balanceOfCall::SELECTOR {
            state.erc1155_balance.abi_encode()
        } else {
            return Err(GatewayError::other("execution reverted"));
        };
        Ok(ret.into())
    }

    async fn get_balance(&self, _address: Address) -> GatewayResult<U256> {
        Ok(self.state.lock().unwrap().native_balance)
    }

    async fn get_pending_nonce(&self, _address: Address) -> GatewayResult<u64> {
        Ok(self.state.lock().unwrap().nonce)
    }

    async fn subscribe_blocks(&self) -> GatewayResult<BlockStream> {
        let rx = self.blocks.subscribe();
        Ok(stream::unfold(rx, |mut rx| async move {
            let hash = rx.recv().await.ok()?;
            Some((hash, rx))
        })
        .boxed())
    }
}

/// A signing boundary that can be paused or told to reject requests.
#[derive(Debug)]
pub struct TestBoundary {
    tx: mpsc::UnboundedSender<TransferRequest>,
    paused: watch::Sender<bool>,
    reject: AtomicBool,
}

impl TestBoundary {
    fn new() -> (Self, mpsc::UnboundedReceiver<TransferRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, paused: watch::channel(false).0, reject: AtomicBool::new(false) }, rx)
    }

    /// Holds requests until [`Self::resume`] is called.
    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    pub fn reject(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }
}

#[async_trait]
impl SigningBoundary for TestBoundary {
    async fn request_transfer(&self, request: TransferRequest) -> Result<(), BoundaryError> {
        let mut paused = self.paused.subscribe();
        paused.wait_for(|paused| !paused).await.map_err(|_| BoundaryError::Closed)?;
        if self.reject.load(Ordering::SeqCst) {
            return Err(BoundaryError::Rejected("user declined".into()));
        }
        self.tx.send(request).map_err(|_| BoundaryError::Closed)
    }
}

/// All settings for configuring the [`Environment`].
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    /// Chain the session opens on.
    pub chain_id: ChainId,
    /// Asset selected when the session opens. Native if `None`.
    pub asset: Option<Asset>,
    pub native_balance: U256,
    pub token_balance: U256,
    /// Gas answered by both chains, or a revert if `None`.
    pub gas: Option<u64>,
    /// Tiers served by the fee feed on every chain.
    pub tiers: GasTiers,
    /// Recipients already in the store.
    pub recipients: Vec<RecentRecipient>,
    pub contacts: Vec<(Address, String)>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            chain_id: MAINNET,
            asset: None,
            native_balance: U256::from(10 * ETHER),
            token_balance: U256::ZERO,
            gas: Some(21_000),
            tiers: GasTiers::new(60 * GWEI, 50 * GWEI, 40 * GWEI),
            recipients: Vec::new(),
            contacts: Vec::new(),
        }
    }
}

/// An open transfer session over mock chains.
///
/// Mainnet prices with EIP-1559 fields and resolves `alice.eth` to [`ALICE`]. Polygon is a
/// legacy chain without names.
#[derive(Debug)]
pub struct Environment {
    pub engine: TransferEngine,
    pub mainnet: Arc<MockGateway>,
    pub polygon: Arc<MockGateway>,
    pub feed: Arc<ConstantFeed>,
    pub storage: Arc<InMemoryStorage>,
    pub boundary: Arc<TestBoundary>,
    pub requests: mpsc::UnboundedReceiver<TransferRequest>,
}

impl Environment {
    pub async fn setup() -> eyre::Result<Self> {
        Self::setup_with_config(EnvironmentConfig::default()).await
    }

    pub async fn setup_with_config(config: EnvironmentConfig) -> eyre::Result<Self> {
        let engine_config = EngineConfig::default();

        let mainnet = Arc::new(MockGateway::new(MAINNET));
        mainnet.with_name("alice.eth", ALICE);
        mainnet.set_nonce(7);
        let polygon = Arc::new(MockGateway::new(POLYGON));
        polygon.set_nonce(3);
        for gateway in [&mainnet, &polygon] {
            gateway.set_gas(config.gas);
            gateway.set_native_balance(config.native_balance);
            gateway.set_token_balance(config.token_balance);
        }

        let mut networks = Networks::default();
        for gateway in [&mainnet, &polygon] {
            let network = engine_config
                .network(gateway.chain_id())
                .cloned()
                .ok_or_eyre("missing default network")?;
            networks = networks.with_network(network, gateway.clone());
        }

        let feed = Arc::new(ConstantFeed::new(config.tiers).with_base_fee(MAINNET, 10 * GWEI));
        let storage = Arc::new(InMemoryStorage::with_recipients(config.recipients));
        let (boundary, requests) = TestBoundary::new();
        let boundary = Arc::new(boundary);

        let services = Services {
            networks,
            feed: feed.clone(),
            store: RecipientStore::new(storage.clone()),
            boundary: boundary.clone(),
        };
        let mut session = Session::new(SENDER, config.chain_id);
        if let Some(asset) = config.asset {
            session = session.with_asset(asset);
        }
        for (address, name) in config.contacts {
            session = session.with_contact(address, name);
        }
        let engine = TransferEngine::open(services, session).await.wrap_err("failed to open")?;

        Ok(Self { engine, mainnet, polygon, feed, storage, boundary, requests })
    }

    pub fn snapshot(&self) -> TransferSnapshot {
        self.engine.snapshot()
    }

    /// Waits until a published snapshot satisfies `f`.
    pub async fn wait_for(
        &self,
        f: impl FnMut(&TransferSnapshot) -> bool,
    ) -> eyre::Result<TransferSnapshot> {
        let mut snapshots = self.engine.subscribe();
        let snapshot = tokio::time::timeout(TIMEOUT, snapshots.wait_for(f))
            .await
            .wrap_err("timed out waiting for snapshot")??
            .clone();
        Ok(snapshot)
    }

    /// Recipients persisted in the store.
    pub async fn stored_recipients(&self) -> eyre::Result<Vec<String>> {
        Ok(self.storage.read_recipients().await?.into_iter().map(|r| r.name).collect())
    }

    /// Applies the inputs of a valid mainnet transfer of `amount` to [`ALICE`].
    pub async fn fill(&self, amount: &str) -> eyre::Result<()> {
        self.engine.set_priority_fee("2").await?;
        self.engine.set_amount(amount).await;
        self.engine.set_recipient(ALICE.to_string()).await;
        Ok(())
    }
}

/// Polls `f` until it returns true.
pub async fn eventually(mut f: impl FnMut() -> bool) -> eyre::Result<()> {
    tokio::time::timeout(TIMEOUT, async {
        while !f() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .wrap_err("condition never held")
}

