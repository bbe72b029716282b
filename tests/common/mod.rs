//! Scripted in-memory contract, wallet and pinning service.

#![allow(dead_code)]

use alloy_primitives::{Address, TxHash, B256, U256};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use property_market::contract::{
    ContractCall, ContractCapabilities, MarketplaceReader, MarketplaceWriter, TxReceipt,
};
use property_market::error::{RpcError, UploadError};
use property_market::gateway::GatewayProbe;
use property_market::models::{ExternalListingDetails, ImageFile, PropertyDetails};
use property_market::upload::ImagePinner;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

pub const ALICE: Address = Address::repeat_byte(0xa1);
pub const BOB: Address = Address::repeat_byte(0xb0);
pub const OWNER: Address = Address::repeat_byte(0x0f);

pub fn eth(whole: u64) -> U256 {
    U256::from(whole) * U256::from(10u64).pow(U256::from(18))
}

pub fn property(name: &str, owner: Address) -> PropertyDetails {
    PropertyDetails {
        name: name.to_string(),
        description: format!("{} description", name),
        property_address: format!("{} street 1", name),
        owner_details: String::new(),
        image_uri: format!("ipfs://Qm{}", name.replace(' ', "")),
        price_in_wei: eth(1),
        owner,
        exists: true,
        is_listed: true,
        is_sold: false,
    }
}

pub fn listing(name: &str, owner: Address) -> ExternalListingDetails {
    ExternalListingDetails {
        nft_contract: Address::repeat_byte(0xcc),
        token_id: U256::from(77),
        name: name.to_string(),
        description: String::new(),
        property_address: String::new(),
        owner_details: String::new(),
        image_uri: String::new(),
        price_in_wei: eth(2),
        owner,
        exists: true,
        is_active: true,
        is_sold: false,
    }
}

#[derive(Default)]
struct ReaderState {
    properties: HashMap<U256, (PropertyDetails, U256)>,
    listings: HashMap<U256, (ExternalListingDetails, U256)>,
    listed_ids: Vec<U256>,
    active_listing_ids: Vec<U256>,
    user_properties: HashMap<Address, Vec<U256>>,
    user_listings: HashMap<Address, Vec<U256>>,
    failing: HashSet<(&'static str, U256)>,
    calls: HashMap<&'static str, usize>,
    balance: U256,
}

/// Contract whose storage and failures are scripted by the test
pub struct MockReader {
    capabilities: ContractCapabilities,
    latency: Duration,
    state: Mutex<ReaderState>,
}

impl MockReader {
    pub fn new(capabilities: ContractCapabilities) -> Self {
        Self {
            capabilities,
            latency: Duration::ZERO,
            state: Mutex::new(ReaderState::default()),
        }
    }

    /// Delay every id-list read by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn add_property(&self, id: u64, details: PropertyDetails, usd: U256) {
        let mut state = self.state.lock().unwrap();
        let id = U256::from(id);
        if details.is_listed {
            state.listed_ids.push(id);
        }
        state
            .user_properties
            .entry(details.owner)
            .or_default()
            .push(id);
        state.properties.insert(id, (details, usd));
    }

    pub fn add_listing(&self, id: u64, details: ExternalListingDetails, usd: U256) {
        let mut state = self.state.lock().unwrap();
        let id = U256::from(id);
        if details.is_active {
            state.active_listing_ids.push(id);
        }
        state.user_listings.entry(details.owner).or_default().push(id);
        state.listings.insert(id, (details, usd));
    }

    /// Put an id on the listed-properties index without storing it
    pub fn list_property_id(&self, id: u64) {
        self.state.lock().unwrap().listed_ids.push(U256::from(id));
    }

    /// Make `method` fail for `id`
    pub fn fail(&self, method: &'static str, id: u64) {
        self.state
            .lock()
            .unwrap()
            .failing
            .insert((method, U256::from(id)));
    }

    pub fn set_balance(&self, balance: U256) {
        self.state.lock().unwrap().balance = balance;
    }

    pub fn calls(&self, method: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(method)
            .copied()
            .unwrap_or(0)
    }

    fn record(&self, method: &'static str, id: U256) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(method).or_default() += 1;
        if state.failing.contains(&(method, id)) {
            return Err(anyhow!("execution reverted: {} {}", method, id));
        }
        Ok(())
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl MarketplaceReader for MockReader {
    fn capabilities(&self) -> &ContractCapabilities {
        &self.capabilities
    }

    async fn contract_name(&self) -> Result<String> {
        self.record("name", U256::ZERO)?;
        Ok("PropertyNFTMarketplace".to_string())
    }

    async fn listed_property_ids(&self) -> Result<Vec<U256>> {
        self.delay().await;
        self.record("getListedProperties", U256::ZERO)?;
        Ok(self.state.lock().unwrap().listed_ids.clone())
    }

    async fn active_external_listing_ids(&self) -> Result<Vec<U256>> {
        self.delay().await;
        self.record("getActiveExternalListings", U256::ZERO)?;
        Ok(self.state.lock().unwrap().active_listing_ids.clone())
    }

    async fn user_property_ids(&self, user: Address) -> Result<Vec<U256>> {
        self.delay().await;
        self.record("getUserProperties", U256::ZERO)?;
        let state = self.state.lock().unwrap();
        Ok(state.user_properties.get(&user).cloned().unwrap_or_default())
    }

    async fn user_external_listing_ids(&self, user: Address) -> Result<Vec<U256>> {
        self.delay().await;
        self.record("getUserExternalListings", U256::ZERO)?;
        let state = self.state.lock().unwrap();
        Ok(state.user_listings.get(&user).cloned().unwrap_or_default())
    }

    async fn property_exists(&self, token_id: U256) -> Result<bool> {
        self.record("propertyExists", token_id)?;
        let state = self.state.lock().unwrap();
        Ok(state.properties.get(&token_id).map_or(false, |(p, _)| p.exists))
    }

    async fn external_listing_exists(&self, listing_id: U256) -> Result<bool> {
        self.record("externalListingExists", listing_id)?;
        let state = self.state.lock().unwrap();
        Ok(state.listings.get(&listing_id).map_or(false, |(l, _)| l.exists))
    }

    async fn property_with_usd_price(&self, token_id: U256) -> Result<(PropertyDetails, U256)> {
        self.record("getPropertyWithUSDPrice", token_id)?;
        self.state
            .lock()
            .unwrap()
            .properties
            .get(&token_id)
            .cloned()
            .ok_or_else(|| anyhow!("Property does not exist"))
    }

    async fn property(&self, token_id: U256) -> Result<PropertyDetails> {
        self.record("properties", token_id)?;
        self.state
            .lock()
            .unwrap()
            .properties
            .get(&token_id)
            .map(|(p, _)| p.clone())
            .ok_or_else(|| anyhow!("Property does not exist"))
    }

    async fn external_listing_with_usd_price(
        &self,
        listing_id: U256,
    ) -> Result<(ExternalListingDetails, U256)> {
        self.record("getExternalListingWithUSDPrice", listing_id)?;
        self.state
            .lock()
            .unwrap()
            .listings
            .get(&listing_id)
            .cloned()
            .ok_or_else(|| anyhow!("Listing does not exist"))
    }

    async fn external_listing(&self, listing_id: U256) -> Result<ExternalListingDetails> {
        self.record("externalListings", listing_id)?;
        self.state
            .lock()
            .unwrap()
            .listings
            .get(&listing_id)
            .map(|(l, _)| l.clone())
            .ok_or_else(|| anyhow!("Listing does not exist"))
    }

    async fn contract_balance(&self) -> Result<U256> {
        self.record("eth_getBalance", U256::ZERO)?;
        Ok(self.state.lock().unwrap().balance)
    }
}

#[derive(Default)]
struct WriterState {
    estimate_error: Option<RpcError>,
    submit_error: Option<RpcError>,
    reverts: bool,
    estimates: usize,
    submitted: Vec<(Address, ContractCall, U256)>,
}

/// Wallet with a fixed account list and scripted failures
pub struct MockWriter {
    accounts: Mutex<Result<Vec<Address>, RpcError>>,
    state: Mutex<WriterState>,
}

impl MockWriter {
    pub fn new(accounts: Vec<Address>) -> Self {
        Self {
            accounts: Mutex::new(Ok(accounts)),
            state: Mutex::new(WriterState::default()),
        }
    }

    pub fn set_accounts(&self, accounts: Result<Vec<Address>, RpcError>) {
        *self.accounts.lock().unwrap() = accounts;
    }

    pub fn fail_estimate(&self, code: i64, message: &str) {
        self.state.lock().unwrap().estimate_error = Some(RpcError::new(code, message));
    }

    pub fn fail_submit(&self, code: i64, message: &str) {
        self.state.lock().unwrap().submit_error = Some(RpcError::new(code, message));
    }

    pub fn revert_on_chain(&self) {
        self.state.lock().unwrap().reverts = true;
    }

    pub fn estimates(&self) -> usize {
        self.state.lock().unwrap().estimates
    }

    pub fn submitted(&self) -> Vec<(Address, ContractCall, U256)> {
        self.state.lock().unwrap().submitted.clone()
    }
}

#[async_trait]
impl MarketplaceWriter for MockWriter {
    async fn accounts(&self) -> Result<Vec<Address>, RpcError> {
        self.accounts.lock().unwrap().clone()
    }

    async fn estimate_gas(&self, _from: Address, _call: &ContractCall) -> Result<U256, RpcError> {
        let mut state = self.state.lock().unwrap();
        state.estimates += 1;
        match &state.estimate_error {
            Some(e) => Err(e.clone()),
            None => Ok(U256::from(100_000)),
        }
    }

    async fn submit(
        &self,
        from: Address,
        call: &ContractCall,
        gas_limit: U256,
    ) -> Result<TxHash, RpcError> {
        let mut state = self.state.lock().unwrap();
        if let Some(e) = &state.submit_error {
            return Err(e.clone());
        }
        state.submitted.push((from, call.clone(), gas_limit));
        Ok(B256::repeat_byte(state.submitted.len() as u8))
    }

    async fn wait_for_receipt(&self, hash: TxHash) -> Result<TxReceipt, RpcError> {
        let state = self.state.lock().unwrap();
        Ok(TxReceipt {
            hash,
            success: !state.reverts,
            block_number: Some(1),
        })
    }
}

/// Pinning service that succeeds with a fixed URL or fails with a status
pub struct MockPinner {
    failure: Option<(u16, String)>,
    pinned: Mutex<Vec<String>>,
}

impl MockPinner {
    pub fn ok() -> Self {
        Self {
            failure: None,
            pinned: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(status: u16, message: &str) -> Self {
        Self {
            failure: Some((status, message.to_string())),
            pinned: Mutex::new(Vec::new()),
        }
    }

    pub fn pinned(&self) -> Vec<String> {
        self.pinned.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImagePinner for MockPinner {
    async fn pin(&self, image: &ImageFile) -> Result<String, UploadError> {
        if let Some((status, message)) = &self.failure {
            return Err(UploadError::from_status(*status, message.clone()));
        }
        self.pinned.lock().unwrap().push(image.file_name.clone());
        Ok(format!("https://gateway.pinata.cloud/ipfs/Qm{}", image.file_name))
    }
}

pub fn png(size: usize) -> ImageFile {
    ImageFile {
        file_name: "house.png".to_string(),
        content_type: "image/png".to_string(),
        bytes: vec![0u8; size],
    }
}

/// Gateway probe that accepts URLs under the given prefixes
pub struct ScriptedProbe {
    reachable: Vec<String>,
    probed: Mutex<Vec<String>>,
}

impl ScriptedProbe {
    pub fn new(reachable: &[&str]) -> Self {
        Self {
            reachable: reachable.iter().map(|p| p.to_string()).collect(),
            probed: Mutex::new(Vec::new()),
        }
    }

    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }
}

#[async_trait]
impl GatewayProbe for ScriptedProbe {
    async fn is_reachable(&self, url: &str) -> bool {
        self.probed.lock().unwrap().push(url.to_string());
        self.reachable.iter().any(|p| url.starts_with(p.as_str()))
    }
}
