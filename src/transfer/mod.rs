//! The transfer state machine.
//!
//! A [`TransferEngine`] holds the parameters of one pending transfer, keeps them in sync with the
//! chain and the fee feed, and hands the finished request to the signing boundary.
//!
//! Every mutation publishes a fresh [`TransferSnapshot`] with recomputed [`DerivedFields`].
//! Responses to asynchronous requests are applied only if no newer request of the same kind was
//! issued in the meantime.

mod assembler;
mod state;
pub use state::{TransferSnapshot, TransferState};
mod ticket;
mod validity;
pub use validity::{DerivedFields, InvalidReason, derive};

use crate::{
    chains::{Network, Networks},
    error::{BoundaryError, TransferError, UnitsError},
    estimation::GasEstimator,
    feed::FeeFeed,
    gateway::{ChainGateway, ChainGatewayExt},
    metrics::TransferMetrics,
    signer::SigningBoundary,
    spawn::TaskHandle,
    storage::{RecipientStore, StorageApi},
    types::{Asset, FeeTier, GasTiers, RecentRecipient, RecipientInput, TransferRequest},
    units::{format_amount, parse_gwei},
};
use alloy::primitives::{Address, ChainId, U256, map::HashMap};
use futures_util::StreamExt;
use std::{
    fmt,
    sync::{Arc, Weak},
    time::Instant,
};
use ticket::{Ticket, Tickets};
use tokio::{
    sync::{Mutex, watch},
    task::JoinError,
};
use tracing::{Instrument, debug, instrument, trace, warn};

/// Collaborators shared by all transfer sessions.
#[derive(Clone)]
pub struct Services {
    /// Supported networks.
    pub networks: Networks,
    /// Gas price feed.
    pub feed: Arc<dyn FeeFeed>,
    /// Recent recipient store.
    pub store: RecipientStore,
    /// The process that signs and broadcasts transfers.
    pub boundary: Arc<dyn SigningBoundary>,
}

/// Parameters of a transfer session.
#[derive(Debug, Clone)]
pub struct Session {
    /// The sending account.
    pub sender: Address,
    /// Chain the session opens on.
    pub chain_id: ChainId,
    /// Asset selected when the session opens. Defaults to the native coin.
    pub asset: Option<Asset>,
    /// Names of known accounts, used to label recipients.
    pub contacts: HashMap<Address, String>,
}

impl Session {
    /// A session for `sender` on `chain_id`.
    pub fn new(sender: Address, chain_id: ChainId) -> Self {
        Self { sender, chain_id, asset: None, contacts: HashMap::default() }
    }

    /// Selects `asset` when the session opens.
    pub fn with_asset(mut self, asset: Asset) -> Self {
        self.asset = Some(asset);
        self
    }

    /// Adds a known account name.
    pub fn with_contact(mut self, address: Address, name: impl Into<String>) -> Self {
        self.contacts.insert(address, name.into());
        self
    }
}

/// Outcome of [`TransferEngine::send_transfer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The request was handed to the signing boundary.
    Submitted(TransferRequest),
    /// Another send was in flight. Nothing was done.
    AlreadySending,
}

/// Mutable engine internals, guarded by one lock that is never held across chain requests.
struct Core {
    state: TransferState,
    network: Network,
    tickets: Tickets,
    metrics: TransferMetrics,
}

/// Live subscriptions of a session. Dropping them releases them.
#[derive(Debug)]
struct Subscriptions {
    _fees: TaskHandle,
    _blocks: Option<TaskHandle>,
}

struct EngineInner {
    services: Services,
    contacts: HashMap<Address, String>,
    core: Mutex<Core>,
    subscriptions: Mutex<Option<Subscriptions>>,
    snapshot: watch::Sender<TransferSnapshot>,
}

impl EngineInner {
    /// Mutates the core and publishes the resulting snapshot.
    async fn update<R>(&self, f: impl FnOnce(&mut Core) -> R) -> R {
        let mut core = self.core.lock().await;
        let out = f(&mut core);
        self.snapshot.send_replace(TransferSnapshot::new(core.state.clone()));
        out
    }
}

/// Handle to a transfer session. Cheap to clone.
#[derive(Clone)]
pub struct TransferEngine {
    inner: Arc<EngineInner>,
}

impl fmt::Debug for TransferEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.inner.snapshot.borrow();
        f.debug_struct("TransferEngine")
            .field("chain_id", &snapshot.state.chain_id)
            .field("sender", &snapshot.state.sender)
            .field("asset", &snapshot.state.asset)
            .finish_non_exhaustive()
    }
}

impl TransferEngine {
    /// Opens a transfer session.
    ///
    /// Loads the recent recipients, subscribes to the fee feed and new blocks, and fetches
    /// balances, the nonce and an initial gas estimate.
    #[instrument(skip_all, fields(sender = %session.sender, chain_id = session.chain_id))]
    pub async fn open(services: Services, session: Session) -> Result<Self, TransferError> {
        let Session { sender, chain_id, asset, contacts } = session;
        let network = services.networks.get(chain_id)?;
        let asset = asset.unwrap_or_else(|| Asset::native(network.config.symbol.clone()));

        let mut state = TransferState::new(chain_id, network.is_eip1559(), sender, asset);
        state.recent_recipients = match services.store.read_recipients().await {
            Ok(recipients) => recipients,
            Err(err) => {
                warn!(%err, "Failed to load recent recipients");
                Vec::new()
            }
        };

        let (snapshot, _) = watch::channel(TransferSnapshot::new(state.clone()));
        let core = Core {
            state,
            network,
            tickets: Tickets::default(),
            metrics: TransferMetrics::for_chain(chain_id),
        };
        let engine = Self {
            inner: Arc::new(EngineInner {
                services,
                contacts,
                core: Mutex::new(core),
                subscriptions: Mutex::new(None),
                snapshot,
            }),
        };

        engine.subscribe_chain().await;
        engine.refresh_all().await;
        debug!("Transfer session opened");
        Ok(engine)
    }

    /// The latest state and derived fields.
    pub fn snapshot(&self) -> TransferSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    /// Subscribes to snapshots published after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<TransferSnapshot> {
        self.inner.snapshot.subscribe()
    }

    /// The recipients sent to before, oldest first.
    pub fn recent_recipients(&self) -> Vec<RecentRecipient> {
        self.inner.snapshot.borrow().state.recent_recipients.clone()
    }

    /// The selected asset balance in human units, e.g. `"1.5"`.
    pub fn selected_asset_max_balance(&self) -> Result<String, TransferError> {
        let snapshot = self.inner.snapshot.borrow();
        Ok(format_amount(snapshot.state.asset_balance, snapshot.state.asset.decimals())?)
    }

    /// Sets the recipient from user input.
    ///
    /// Addresses apply immediately. Anything else is resolved as a name; a resolution that is
    /// superseded by a later call is discarded. Failures leave the recipient unresolved. The gas
    /// limit is re-estimated afterwards.
    #[instrument(skip_all)]
    pub async fn set_recipient(&self, input: impl Into<String>) {
        let input = input.into();
        let pending = self
            .inner
            .update(|core| {
                core.state.recipient_input = input.clone();
                match RecipientInput::classify(&input) {
                    RecipientInput::Name(name) if !name.is_empty() => {
                        let ticket = core.tickets.resolution.issue();
                        core.state.resolved_address = None;
                        core.state.is_name_resolution = false;
                        core.state.is_resolving_recipient = true;
                        core.metrics.resolutions.increment(1);
                        Some((ticket, name, core.network.gateway.clone()))
                    }
                    classified => {
                        core.tickets.resolution.invalidate();
                        core.state.resolved_address = match classified {
                            RecipientInput::Address(address) => Some(address),
                            RecipientInput::Name(_) => None,
                        };
                        core.state.is_name_resolution = false;
                        core.state.is_resolving_recipient = false;
                        None
                    }
                }
            })
            .await;

        let Some((ticket, name, gateway)) = pending else {
            self.estimate_gas().await;
            return;
        };

        let resolution = self
            .detached(move |engine| async move {
                if engine.resolve(ticket, name, gateway).await {
                    engine.estimate_gas().await;
                }
            })
            .await;
        if let Err(err) = resolution {
            warn!(%err, "Name resolution task failed");
        }
    }

    /// Resolves `name` and applies the result if `ticket` is still current.
    ///
    /// Returns whether the result was applied.
    async fn resolve(&self, ticket: Ticket, name: String, gateway: Arc<dyn ChainGateway>) -> bool {
        let started = Instant::now();
        let resolved = match gateway.resolve_name(&name).await {
            Ok(resolved) => resolved,
            Err(err) => {
                warn!(%name, %err, "Name resolution failed");
                None
            }
        };

        self.inner
            .update(|core| {
                if !core.tickets.resolution.is_current(ticket) {
                    trace!(%name, "Discarding superseded name resolution");
                    core.metrics.stale_responses.increment(1);
                    return false;
                }
                core.metrics.resolution_latency.record(started.elapsed().as_millis() as f64);
                if resolved.is_none() {
                    core.metrics.resolution_failures.increment(1);
                }
                debug!(%name, ?resolved, "Resolved name");
                core.state.resolved_address = resolved;
                core.state.is_name_resolution = true;
                core.state.is_resolving_recipient = false;
                true
            })
            .await
    }

    /// Selects an asset, keeping the entered amount.
    ///
    /// The balance and the gas limit are reset until they are fetched for the new asset, so the
    /// transfer is invalid in between.
    #[instrument(skip_all, fields(asset = %asset.id()))]
    pub async fn select_asset(&self, asset: Asset) {
        self.inner
            .update(|core| {
                core.tickets.balance.invalidate();
                core.tickets.estimation.invalidate();
                core.state.asset = asset;
                core.state.rederive_amount();
                core.state.asset_balance = U256::ZERO;
                core.state.gas_limit = 0;
                core.state.gas_error = None;
                core.state.is_estimating_gas = true;
            })
            .await;
        self.refresh_asset().await;
    }

    /// Selects an asset from the picker, clearing the entered amount.
    pub async fn set_asset(&self, asset: Asset) {
        self.inner.update(|core| core.state.set_amount_text(String::new())).await;
        self.select_asset(asset).await;
    }

    /// Selects the asset with the given id out of `assets`, or the first one if none matches.
    pub async fn select_asset_by_id(&self, assets: &[Asset], id: &str) {
        let asset = match assets.iter().find(|asset| asset.matches_id(id)).or(assets.first()) {
            Some(asset) => asset.clone(),
            None => {
                let core = self.inner.core.lock().await;
                Asset::native(core.network.config.symbol.clone())
            }
        };
        self.select_asset(asset).await;
    }

    /// Sets the amount text. The gas limit is re-estimated if the base units changed.
    #[instrument(skip_all)]
    pub async fn set_amount(&self, amount: impl Into<String>) {
        let amount = amount.into();
        let changed = self
            .inner
            .update(|core| {
                let before = core.state.amount;
                core.state.set_amount_text(amount);
                core.state.amount != before
            })
            .await;
        if changed {
            self.estimate_gas().await;
        }
    }

    /// Overrides the gas limit.
    pub async fn set_gas_limit(&self, gas_limit: u64) {
        self.inner.update(|core| core.state.gas_limit = gas_limit).await;
    }

    /// Sets a custom gas price in gwei. Switches to [`FeeTier::Custom`].
    pub async fn set_gas_price(&self, gwei: &str) -> Result<(), TransferError> {
        let price = parse_gwei(gwei)?;
        self.inner
            .update(|core| {
                core.state.fee_tier = FeeTier::Custom;
                core.state.gas_price = price;
            })
            .await;
        Ok(())
    }

    /// Sets the priority fee in gwei. Empty and negative values are floored at zero.
    pub async fn set_priority_fee(&self, gwei: &str) -> Result<(), TransferError> {
        let fee = match parse_gwei(gwei) {
            Ok(fee) => fee,
            Err(UnitsError::Empty | UnitsError::Negative) => 0,
            Err(err) => return Err(err.into()),
        };
        self.inner.update(|core| core.state.priority_fee = fee).await;
        Ok(())
    }

    /// Overrides the nonce.
    pub async fn set_nonce(&self, nonce: u64) {
        self.inner.update(|core| core.state.nonce = Some(nonce)).await;
    }

    /// Selects a fee tier. Feed tiers overwrite the gas price with the current feed value.
    pub async fn set_fee_tier(&self, tier: FeeTier) {
        self.inner
            .update(|core| {
                core.state.fee_tier = tier;
                core.state.apply_tier_price();
            })
            .await;
    }

    /// Moves the session to another chain.
    ///
    /// The current subscriptions are released before the new chain's fee feed and block stream
    /// are subscribed to. The native coin of the new chain is selected and every chain-specific
    /// value is fetched again.
    #[instrument(skip(self))]
    pub async fn switch_chain(&self, chain_id: ChainId) -> Result<(), TransferError> {
        let network = self.inner.services.networks.get(chain_id)?;
        self.unsubscribe().await;

        let name = self
            .inner
            .update(|core| {
                core.tickets.invalidate_all();
                core.metrics = TransferMetrics::for_chain(chain_id);

                let state = &mut core.state;
                state.chain_id = chain_id;
                state.eip1559 = network.is_eip1559();
                state.asset = Asset::native(network.config.symbol.clone());
                state.rederive_amount();
                state.asset_balance = U256::ZERO;
                state.native_balance = U256::ZERO;
                state.gas_limit = 0;
                state.gas_error = None;
                state.gas_tiers = GasTiers::default();
                state.nonce = None;
                state.next_block_base_fee = None;
                state.is_resolving_recipient = false;
                state.is_estimating_gas = false;
                core.network = network;

                // names may resolve differently on the new chain
                match RecipientInput::classify(&core.state.recipient_input) {
                    RecipientInput::Name(name) if !name.is_empty() => {
                        core.state.resolved_address = None;
                        core.state.is_name_resolution = false;
                        Some(name)
                    }
                    _ => None,
                }
            })
            .await;

        self.subscribe_chain().await;
        match name {
            Some(name) => {
                tokio::join!(self.set_recipient(name), self.refresh_all());
            }
            None => self.refresh_all().await,
        }
        debug!("Switched chain");
        Ok(())
    }

    /// Fetches the balance of the selected asset and the native balance of the sender.
    #[instrument(skip_all)]
    pub async fn refresh_balance(&self) -> Result<(), TransferError> {
        let (ticket, gateway, sender, asset) = self
            .inner
            .update(|core| {
                (
                    core.tickets.balance.issue(),
                    core.network.gateway.clone(),
                    core.state.sender,
                    core.state.asset.clone(),
                )
            })
            .await;

        let (asset_balance, native_balance) = if asset.is_native() {
            let balance = gateway.get_balance(sender).await?;
            (balance, balance)
        } else {
            tokio::try_join!(gateway.asset_balance(&asset, sender), gateway.get_balance(sender))?
        };

        self.inner
            .update(|core| {
                if !core.tickets.balance.is_current(ticket) {
                    trace!("Discarding superseded balance");
                    core.metrics.stale_responses.increment(1);
                    return;
                }
                core.state.asset_balance = asset_balance;
                core.state.native_balance = native_balance;
            })
            .await;
        Ok(())
    }

    /// Fetches the pending nonce of the sender.
    #[instrument(skip_all)]
    pub async fn refresh_nonce(&self) -> Result<(), TransferError> {
        let (ticket, gateway, sender) = self
            .inner
            .update(|core| {
                (core.tickets.nonce.issue(), core.network.gateway.clone(), core.state.sender)
            })
            .await;

        let nonce = gateway.get_pending_nonce(sender).await?;

        self.inner
            .update(|core| {
                if core.tickets.nonce.is_current(ticket) {
                    core.state.nonce = Some(nonce);
                } else {
                    core.metrics.stale_responses.increment(1);
                }
            })
            .await;
        Ok(())
    }

    /// Fetches the base fee of the next block. No-op on legacy chains.
    pub async fn refresh_base_fee(&self) {
        let Some((ticket, chain_id)) = self
            .inner
            .update(|core| {
                core.state.eip1559.then(|| (core.tickets.base_fee.issue(), core.state.chain_id))
            })
            .await
        else {
            return;
        };

        let base_fee = self.inner.services.feed.next_block_base_fee(chain_id).await;

        self.inner
            .update(|core| {
                if core.tickets.base_fee.is_current(ticket) {
                    core.state.next_block_base_fee = base_fee;
                } else {
                    core.metrics.stale_responses.increment(1);
                }
            })
            .await;
    }

    /// Hands the transfer to the signing boundary.
    ///
    /// A call while another send is in flight does nothing. The in-flight flag is cleared and the
    /// recipient remembered whether or not the boundary accepted the request, even if this future
    /// is dropped before the boundary answered.
    #[instrument(skip_all)]
    pub async fn send_transfer(&self) -> Result<SendOutcome, TransferError> {
        let prepared = self
            .inner
            .update(|core| -> Result<_, TransferError> {
                if core.state.is_sending {
                    return Ok(None);
                }
                let request = assembler::assemble(&core.state, &self.inner.contacts)?;
                core.state.is_sending = true;
                Ok(Some((request, core.state.recipient_input.clone())))
            })
            .await;
        let Some((request, recipient)) = prepared? else {
            debug!("Send already in flight");
            return Ok(SendOutcome::AlreadySending);
        };

        let handover = request.clone();
        self.detached(move |engine| async move { engine.hand_over(handover, recipient).await })
            .await??;
        debug!(to = %request.to, value = %request.value, "Transfer handed to signing boundary");
        Ok(SendOutcome::Submitted(request))
    }

    /// Passes `request` to the signing boundary, then clears the in-flight flag and remembers
    /// the recipient.
    async fn hand_over(
        &self,
        request: TransferRequest,
        recipient: String,
    ) -> Result<(), BoundaryError> {
        let result = self.inner.services.boundary.request_transfer(request).await;

        let recipients = self
            .inner
            .update(|core| {
                core.state.is_sending = false;
                match &result {
                    Ok(()) => core.metrics.submitted.increment(1),
                    Err(_) => core.metrics.boundary_failures.increment(1),
                }
                core.state
                    .remember_recipient(&recipient)
                    .then(|| core.state.recent_recipients.clone())
            })
            .await;

        if let Some(recipients) = recipients {
            if let Err(err) = self.inner.services.store.write_recipients(&recipients).await {
                warn!(%err, "Failed to save recent recipients");
            }
        }
        result
    }

    /// Runs `task` on its own tokio task and waits for it.
    ///
    /// The task runs to completion even if the returned future is dropped, so the flags it set
    /// are always cleared.
    async fn detached<T, Fut>(&self, task: impl FnOnce(Self) -> Fut) -> Result<T, JoinError>
    where
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        tokio::spawn(task(self.clone()).in_current_span()).await
    }

    /// Releases all subscriptions and discards in-flight responses.
    pub async fn dispose(&self) {
        self.unsubscribe().await;
        self.inner.update(|core| core.tickets.invalidate_all()).await;
        debug!("Transfer session disposed");
    }

    /// Whether the fee feed or block subscriptions are held.
    pub async fn is_subscribed(&self) -> bool {
        self.inner.subscriptions.lock().await.is_some()
    }

    async fn unsubscribe(&self) {
        if self.inner.subscriptions.lock().await.take().is_some() {
            trace!("Released subscriptions");
        }
    }

    /// Subscribes to the fee feed and, on EIP-1559 chains, to new blocks of the current chain.
    async fn subscribe_chain(&self) {
        let (chain_id, eip1559, gateway) = {
            let core = self.inner.core.lock().await;
            (core.state.chain_id, core.state.eip1559, core.network.gateway.clone())
        };

        let mut tiers_rx = self.inner.services.feed.subscribe(chain_id);
        let tiers = *tiers_rx.borrow_and_update();
        self.apply_tiers(chain_id, tiers).await;

        let weak = Arc::downgrade(&self.inner);
        let fees = TaskHandle::spawn(async move {
            while tiers_rx.changed().await.is_ok() {
                let tiers = *tiers_rx.borrow_and_update();
                let Some(engine) = upgrade(&weak) else { break };
                engine.apply_tiers(chain_id, tiers).await;
            }
        });

        let blocks = if eip1559 {
            match gateway.subscribe_blocks().await {
                Ok(mut blocks) => {
                    let weak = Arc::downgrade(&self.inner);
                    Some(TaskHandle::spawn(async move {
                        while let Some(hash) = blocks.next().await {
                            trace!(%hash, "New block");
                            let Some(engine) = upgrade(&weak) else { break };
                            engine.refresh_base_fee().await;
                        }
                    }))
                }
                Err(err) => {
                    warn!(chain_id, %err, "Failed to subscribe to new blocks");
                    None
                }
            }
        } else {
            None
        };

        *self.inner.subscriptions.lock().await = Some(Subscriptions { _fees: fees, _blocks: blocks });
    }

    async fn apply_tiers(&self, chain_id: ChainId, tiers: GasTiers) {
        self.inner
            .update(|core| {
                if core.state.chain_id != chain_id {
                    return;
                }
                core.state.gas_tiers = tiers;
                core.state.apply_tier_price();
            })
            .await;
    }

    /// Re-estimates the gas limit for the current asset, recipient and amount.
    async fn estimate_gas(&self) {
        if let Err(err) = self.detached(|engine| async move { engine.run_estimate().await }).await
        {
            warn!(%err, "Gas estimation task failed");
        }
    }

    async fn run_estimate(&self) {
        let (ticket, gateway, sender, asset, recipient, amount) = self
            .inner
            .update(|core| {
                core.state.is_estimating_gas = true;
                core.metrics.gas_estimates.increment(1);
                (
                    core.tickets.estimation.issue(),
                    core.network.gateway.clone(),
                    core.state.sender,
                    core.state.asset.clone(),
                    core.state.resolved_address,
                    core.state.amount.unwrap_or_default(),
                )
            })
            .await;

        let estimate =
            GasEstimator::new(gateway.as_ref(), sender).estimate(&asset, recipient, amount).await;

        self.inner
            .update(|core| {
                if !core.tickets.estimation.is_current(ticket) {
                    trace!("Discarding superseded gas estimate");
                    core.metrics.stale_responses.increment(1);
                    return;
                }
                core.state.is_estimating_gas = false;
                match estimate {
                    Ok(estimate) => {
                        if estimate.is_fallback() {
                            core.metrics.gas_estimate_fallbacks.increment(1);
                        }
                        core.state.gas_limit = estimate.gas();
                        core.state.gas_error = None;
                    }
                    Err(err) => {
                        warn!(%err, asset = %asset.id(), "Gas estimation failed");
                        core.state.gas_limit = 0;
                        core.state.gas_error = Some(err.to_string());
                    }
                }
            })
            .await;
    }

    async fn refresh_asset(&self) {
        let (balance, ()) = tokio::join!(self.refresh_balance(), self.estimate_gas());
        if let Err(err) = balance {
            warn!(%err, "Failed to refresh balance");
        }
    }

    async fn refresh_all(&self) {
        let (balance, nonce, (), ()) = tokio::join!(
            self.refresh_balance(),
            self.refresh_nonce(),
            self.refresh_base_fee(),
            self.estimate_gas()
        );
        if let Err(err) = balance {
            warn!(%err, "Failed to refresh balance");
        }
        if let Err(err) = nonce {
            warn!(%err, "Failed to fetch nonce");
        }
    }
}

fn upgrade(weak: &Weak<EngineInner>) -> Option<TransferEngine> {
    weak.upgrade().map(|inner| TransferEngine { inner })
}
