//! Connection state and the collections shown to the user.
//!
//! Every display collection sits in a [`SequencedSlot`]: a load takes a ticket
//! before it starts and its result is only stored if no newer load (or reset)
//! was issued in the meantime.

use crate::config::Config;
use crate::contract::{ContractCapabilities, MarketplaceReader, MarketplaceWriter};
use crate::error::ConnectError;
use crate::gateway::{GatewayProbe, GatewayResolver};
use crate::loader::{ItemLoader, Scope};
use crate::models::ListingRecord;
use crate::orchestrator::{
    Action, Confirmation, MutationFailure, MutationOrchestrator, OrchestratorSettings, ReloadPlan,
    ReloadTarget,
};
use crate::price::ZeroPricePolicy;
use crate::upload::ImagePinner;
use crate::view::{Tab, ViewState};
use alloy_primitives::{Address, U256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Value guarded by a monotonic request counter
pub struct SequencedSlot<T> {
    issued: AtomicU64,
    value: Mutex<T>,
}

impl<T: Clone + Default> Default for SequencedSlot<T> {
    fn default() -> Self {
        Self {
            issued: AtomicU64::new(0),
            value: Mutex::new(T::default()),
        }
    }
}

impl<T: Clone + Default> SequencedSlot<T> {
    /// Ticket for a new load; invalidates every earlier ticket
    pub fn begin(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Store `value` if `ticket` is still the latest one issued
    pub fn apply(&self, ticket: u64, value: T) -> bool {
        let mut guard = self.lock();
        if ticket != self.issued.load(Ordering::SeqCst) {
            debug!("Discarding stale load result (ticket {})", ticket);
            return false;
        }
        *guard = value;
        true
    }

    pub fn get(&self) -> T {
        self.lock().clone()
    }

    /// Clear the value and orphan any load in flight
    pub fn reset(&self) {
        let mut guard = self.lock();
        self.issued.fetch_add(1, Ordering::SeqCst);
        *guard = T::default();
    }

    fn lock(&self) -> MutexGuard<'_, T> {
        self.value.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Notifications coming from the wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
    Disconnect,
}

#[derive(Debug, Clone, Default)]
struct Messages {
    error: Option<String>,
    success: Option<String>,
}

/// Outcome of a confirmed action plus the pending delayed reload
pub struct Completed {
    pub confirmation: Confirmation,
    pub reload: JoinHandle<()>,
}

pub struct Session {
    reader: Arc<dyn MarketplaceReader>,
    writer: Arc<dyn MarketplaceWriter>,
    loader: ItemLoader,
    orchestrator: MutationOrchestrator,
    owner: Address,
    contract_address: Address,
    zero_price_policy: ZeroPricePolicy,
    account: RwLock<Option<Address>>,
    marketplace: SequencedSlot<Vec<ListingRecord>>,
    my_properties: SequencedSlot<Vec<ListingRecord>>,
    my_listings: SequencedSlot<Vec<ListingRecord>>,
    balance: SequencedSlot<U256>,
    messages: Mutex<Messages>,
}

impl Session {
    pub fn new(
        config: &Config,
        reader: Arc<dyn MarketplaceReader>,
        writer: Arc<dyn MarketplaceWriter>,
        pinner: Arc<dyn ImagePinner>,
    ) -> Self {
        let resolver = GatewayResolver::new(
            config.gateways.clone(),
            config.placeholder_image.clone(),
            config.mirror_policy,
        );
        let capabilities = reader.capabilities().clone();
        let loader = ItemLoader::new(reader.clone(), resolver, config.fallback_policy);
        let orchestrator = MutationOrchestrator::new(
            writer.clone(),
            pinner,
            capabilities,
            OrchestratorSettings {
                owner: config.owner_address,
                gas_headroom_percent: config.gas_headroom_percent,
                max_image_bytes: config.max_image_bytes,
                reload_delay: config.reload_delay(),
            },
        );

        Self {
            reader,
            writer,
            loader,
            orchestrator,
            owner: config.owner_address,
            contract_address: config.contract_address,
            zero_price_policy: config.zero_price_policy,
            account: RwLock::new(None),
            marketplace: SequencedSlot::default(),
            my_properties: SequencedSlot::default(),
            my_listings: SequencedSlot::default(),
            balance: SequencedSlot::default(),
            messages: Mutex::new(Messages::default()),
        }
    }

    /// Let loads pick a live gateway mirror (only used with ordered failover)
    pub fn with_gateway_probe(mut self, probe: Arc<dyn GatewayProbe>) -> Self {
        self.loader = self.loader.with_probe(probe);
        self
    }

    pub fn capabilities(&self) -> &ContractCapabilities {
        self.reader.capabilities()
    }

    pub fn account(&self) -> Option<Address> {
        *self.account.read().unwrap_or_else(|p| p.into_inner())
    }

    fn set_account(&self, account: Option<Address>) {
        *self.account.write().unwrap_or_else(|p| p.into_inner()) = account;
    }

    pub fn is_owner(&self) -> bool {
        self.account() == Some(self.owner)
    }

    pub fn marketplace(&self) -> Vec<ListingRecord> {
        self.marketplace.get()
    }

    pub fn my_properties(&self) -> Vec<ListingRecord> {
        self.my_properties.get()
    }

    pub fn my_listings(&self) -> Vec<ListingRecord> {
        self.my_listings.get()
    }

    pub fn balance(&self) -> U256 {
        self.balance.get()
    }

    pub fn error_message(&self) -> Option<String> {
        self.messages().error.clone()
    }

    pub fn success_message(&self) -> Option<String> {
        self.messages().success.clone()
    }

    pub fn clear_messages(&self) {
        *self.messages() = Messages::default();
    }

    fn messages(&self) -> MutexGuard<'_, Messages> {
        self.messages.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn set_error(&self, message: impl Into<String>) {
        let mut messages = self.messages();
        messages.error = Some(message.into());
        messages.success = None;
    }

    fn set_success(&self, message: impl Into<String>) {
        let mut messages = self.messages();
        messages.success = Some(message.into());
        messages.error = None;
    }

    /// Request accounts, probe the contract and load everything
    pub async fn connect(&self) -> Result<Address, ConnectError> {
        match self.try_connect().await {
            Ok(account) => {
                self.set_success("Wallet connected successfully!");
                self.refresh().await;
                Ok(account)
            }
            Err(e) => {
                error!("Wallet connection error: {}", e);
                self.set_error(e.to_string());
                Err(e)
            }
        }
    }

    async fn try_connect(&self) -> Result<Address, ConnectError> {
        let accounts = self
            .writer
            .accounts()
            .await
            .map_err(ConnectError::from_provider)?;
        let account = *accounts.first().ok_or(ConnectError::NoAccounts)?;

        let name = self
            .reader
            .contract_name()
            .await
            .map_err(ConnectError::ContractUnavailable)?;
        info!("Connected to contract: {} as {}", name, account);

        self.set_account(Some(account));
        Ok(account)
    }

    pub fn disconnect(&self) {
        self.reset();
        self.set_success("Wallet disconnected successfully");
    }

    fn reset(&self) {
        self.set_account(None);
        self.marketplace.reset();
        self.my_properties.reset();
        self.my_listings.reset();
        self.balance.reset();
    }

    pub async fn handle_event(&self, event: WalletEvent) {
        info!("Wallet event: {:?}", event);
        match event {
            WalletEvent::AccountsChanged(accounts) => match accounts.first() {
                None => self.reset(),
                Some(first) if Some(*first) != self.account() => {
                    self.reset();
                    // connect() records its own failure message
                    let _ = self.connect().await;
                }
                Some(_) => {}
            },
            WalletEvent::ChainChanged(chain_id) => {
                warn!("Network changed to chain {}; reconnect required", chain_id);
                self.reset();
            }
            WalletEvent::Disconnect => self.reset(),
        }
    }

    async fn load_into(&self, scope: Scope, slot: &SequencedSlot<Vec<ListingRecord>>) -> bool {
        let ticket = slot.begin();
        let report = self.loader.load(scope, self.account()).await;
        slot.apply(ticket, report.records)
    }

    pub async fn load_marketplace(&self) -> bool {
        self.load_into(Scope::AllActive, &self.marketplace).await
    }

    pub async fn load_my_properties(&self) -> bool {
        if self.account().is_none() {
            return false;
        }
        self.load_into(Scope::MineInternal, &self.my_properties).await
    }

    pub async fn load_my_listings(&self) -> bool {
        if self.account().is_none() {
            return false;
        }
        self.load_into(Scope::MineExternal, &self.my_listings).await
    }

    pub async fn load_balance(&self) -> bool {
        let ticket = self.balance.begin();
        match self.reader.contract_balance().await {
            Ok(balance) => self.balance.apply(ticket, balance),
            Err(e) => {
                error!("Failed to load contract balance: {:#}", e);
                false
            }
        }
    }

    /// Reload every collection concurrently
    pub async fn refresh(&self) {
        if self.account().is_none() {
            return;
        }
        tokio::join!(
            self.load_marketplace(),
            self.load_my_properties(),
            self.load_my_listings(),
            self.load_balance(),
        );
        info!("Data refreshed");
    }

    async fn reload(&self, targets: &[ReloadTarget]) {
        for target in targets {
            match target {
                ReloadTarget::Marketplace => {
                    self.load_marketplace().await;
                }
                ReloadTarget::MyProperties => {
                    self.load_my_properties().await;
                }
                ReloadTarget::MyListings => {
                    self.load_my_listings().await;
                }
                ReloadTarget::Balance => {
                    self.load_balance().await;
                }
            }
        }
    }

    /// Reload the plan's targets after its delay, off the caller's task
    pub fn schedule_reload(self: &Arc<Self>, plan: ReloadPlan) -> JoinHandle<()> {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(plan.delay).await;
            debug!("Running delayed reload of {:?}", plan.targets);
            session.reload(&plan.targets).await;
        })
    }

    /// Run an action; on success schedule the delayed reload
    pub async fn perform(self: &Arc<Self>, action: Action) -> Result<Completed, MutationFailure> {
        self.clear_messages();
        match self.orchestrator.execute(self.account(), action).await {
            Ok(confirmation) => {
                self.set_success(confirmation.message.clone());
                let reload = self.schedule_reload(confirmation.reload.clone());
                Ok(Completed {
                    confirmation,
                    reload,
                })
            }
            Err(failure) => {
                self.set_error(failure.to_string());
                Err(failure)
            }
        }
    }

    /// Snapshot for rendering
    pub fn view_state(&self, tab: Tab) -> ViewState {
        let messages = self.messages().clone();
        ViewState {
            tab,
            account: self.account(),
            contract_address: self.contract_address,
            is_owner: self.is_owner(),
            capabilities: self.capabilities().clone(),
            marketplace: self.marketplace(),
            my_properties: self.my_properties(),
            my_listings: self.my_listings(),
            contract_balance: self.balance(),
            zero_price_policy: self.zero_price_policy,
            placeholder_image: self.loader.resolver().placeholder().to_string(),
            error: messages.error,
            success: messages.success,
        }
    }
}
