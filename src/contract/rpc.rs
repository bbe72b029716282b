use crate::contract::abi::IPropertyMarketplace;
use crate::contract::capabilities::ContractCapabilities;
use crate::contract::traits::{MarketplaceReader, MarketplaceWriter};
use crate::contract::types::{ContractCall, TxReceipt};
use crate::error::RpcError;
use crate::models::{ExternalListingDetails, PropertyDetails};
use alloy_primitives::{Address, Bytes, TxHash, U256, U64};
use alloy_sol_types::SolCall;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Code used for failures that never reached the endpoint
pub const TRANSPORT_ERROR_CODE: i64 = crate::error::codes::TRANSPORT;

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Minimal JSON-RPC 2.0 client over HTTP
pub struct RpcClient {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send one request and decode its `result`
    pub async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id
        });

        debug!("RPC {} (id {})", method, id);

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::new(TRANSPORT_ERROR_CODE, format!("RPC request failed: {}", e)))?;

        let parsed: RpcResponse = response.json().await.map_err(|e| {
            RpcError::new(TRANSPORT_ERROR_CODE, format!("Failed to parse RPC response: {}", e))
        })?;

        if let Some(err) = parsed.error {
            return Err(RpcError::new(err.code, err.message));
        }

        serde_json::from_value(parsed.result).map_err(|e| {
            RpcError::new(TRANSPORT_ERROR_CODE, format!("Unexpected {} result: {}", method, e))
        })
    }
}

/// Contract reads through `eth_call`
pub struct RpcMarketplace {
    rpc: RpcClient,
    address: Address,
    capabilities: ContractCapabilities,
}

impl RpcMarketplace {
    pub fn new(rpc: RpcClient, address: Address, capabilities: ContractCapabilities) -> Self {
        Self {
            rpc,
            address,
            capabilities,
        }
    }

    async fn call<C>(&self, call: C) -> Result<C::Return>
    where
        C: SolCall + Send + Sync,
    {
        let data = Bytes::from(call.abi_encode());
        let raw: Bytes = self
            .rpc
            .request("eth_call", json!([{ "to": self.address, "data": data }, "latest"]))
            .await
            .with_context(|| format!("eth_call {} failed", C::SIGNATURE))?;

        C::abi_decode_returns(&raw, true)
            .with_context(|| format!("Failed to decode {} result", C::SIGNATURE))
    }
}

#[async_trait]
impl MarketplaceReader for RpcMarketplace {
    fn capabilities(&self) -> &ContractCapabilities {
        &self.capabilities
    }

    async fn contract_name(&self) -> Result<String> {
        Ok(self.call(IPropertyMarketplace::nameCall {}).await?._0)
    }

    async fn listed_property_ids(&self) -> Result<Vec<U256>> {
        Ok(self.call(IPropertyMarketplace::getListedPropertiesCall {}).await?._0)
    }

    async fn active_external_listing_ids(&self) -> Result<Vec<U256>> {
        Ok(self
            .call(IPropertyMarketplace::getActiveExternalListingsCall {})
            .await?
            ._0)
    }

    async fn user_property_ids(&self, user: Address) -> Result<Vec<U256>> {
        Ok(self
            .call(IPropertyMarketplace::getUserPropertiesCall { user })
            .await?
            ._0)
    }

    async fn user_external_listing_ids(&self, user: Address) -> Result<Vec<U256>> {
        Ok(self
            .call(IPropertyMarketplace::getUserExternalListingsCall { user })
            .await?
            ._0)
    }

    async fn property_exists(&self, token_id: U256) -> Result<bool> {
        Ok(self
            .call(IPropertyMarketplace::propertyExistsCall { tokenId: token_id })
            .await?
            ._0)
    }

    async fn external_listing_exists(&self, listing_id: U256) -> Result<bool> {
        Ok(self
            .call(IPropertyMarketplace::externalListingExistsCall {
                listingId: listing_id,
            })
            .await?
            ._0)
    }

    async fn property_with_usd_price(&self, token_id: U256) -> Result<(PropertyDetails, U256)> {
        let ret = self
            .call(IPropertyMarketplace::getPropertyWithUSDPriceCall { tokenId: token_id })
            .await?;
        Ok((ret.property.into(), ret.priceInUSD))
    }

    async fn property(&self, token_id: U256) -> Result<PropertyDetails> {
        let ret = self
            .call(IPropertyMarketplace::propertiesCall { tokenId: token_id })
            .await?;
        Ok(ret.into())
    }

    async fn external_listing_with_usd_price(
        &self,
        listing_id: U256,
    ) -> Result<(ExternalListingDetails, U256)> {
        let ret = self
            .call(IPropertyMarketplace::getExternalListingWithUSDPriceCall {
                listingId: listing_id,
            })
            .await?;
        Ok((ret.listing.into(), ret.priceInUSD))
    }

    async fn external_listing(&self, listing_id: U256) -> Result<ExternalListingDetails> {
        let ret = self
            .call(IPropertyMarketplace::externalListingsCall {
                listingId: listing_id,
            })
            .await?;
        Ok(ret.into())
    }

    async fn contract_balance(&self) -> Result<U256> {
        self.rpc
            .request("eth_getBalance", json!([self.address, "latest"]))
            .await
            .context("Failed to load contract balance")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: TxHash,
    status: Option<U64>,
    block_number: Option<U64>,
}

/// Wallet backed by a node that holds the signing keys (`eth_sendTransaction`)
pub struct RpcWallet {
    rpc: RpcClient,
    contract: Address,
    poll_interval: Duration,
    confirmation_timeout: Duration,
}

impl RpcWallet {
    pub fn new(
        rpc: RpcClient,
        contract: Address,
        poll_interval: Duration,
        confirmation_timeout: Duration,
    ) -> Self {
        Self {
            rpc,
            contract,
            poll_interval,
            confirmation_timeout,
        }
    }

    fn transaction(&self, from: Address, call: &ContractCall) -> Value {
        json!({
            "from": from,
            "to": self.contract,
            "data": call.calldata(),
            "value": call.value(),
        })
    }
}

#[async_trait]
impl MarketplaceWriter for RpcWallet {
    async fn accounts(&self) -> Result<Vec<Address>, RpcError> {
        self.rpc.request("eth_accounts", json!([])).await
    }

    async fn estimate_gas(&self, from: Address, call: &ContractCall) -> Result<U256, RpcError> {
        self.rpc
            .request("eth_estimateGas", json!([self.transaction(from, call)]))
            .await
    }

    async fn submit(
        &self,
        from: Address,
        call: &ContractCall,
        gas_limit: U256,
    ) -> Result<TxHash, RpcError> {
        let mut tx = self.transaction(from, call);
        tx["gas"] = json!(gas_limit);
        let hash: TxHash = self.rpc.request("eth_sendTransaction", json!([tx])).await?;
        info!("Transaction submitted: {}", hash);
        Ok(hash)
    }

    async fn wait_for_receipt(&self, hash: TxHash) -> Result<TxReceipt, RpcError> {
        let started = tokio::time::Instant::now();

        loop {
            let receipt: Option<RawReceipt> = self
                .rpc
                .request("eth_getTransactionReceipt", json!([hash]))
                .await?;

            if let Some(raw) = receipt {
                let success = raw.status.map(|s| s == U64::from(1)).unwrap_or(false);
                if !success {
                    warn!("Transaction {} reverted", raw.transaction_hash);
                }
                return Ok(TxReceipt {
                    hash: raw.transaction_hash,
                    success,
                    block_number: raw.block_number.map(|n| n.to::<u64>()),
                });
            }

            if started.elapsed() >= self.confirmation_timeout {
                return Err(RpcError::new(
                    TRANSPORT_ERROR_CODE,
                    format!("Timed out waiting for transaction {}", hash),
                ));
            }

            debug!("Receipt for {} not available yet", hash);
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
