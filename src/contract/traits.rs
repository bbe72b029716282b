use crate::contract::capabilities::ContractCapabilities;
use crate::contract::types::{ContractCall, TxReceipt};
use crate::error::RpcError;
use crate::models::{ExternalListingDetails, PropertyDetails};
use alloy_primitives::{Address, TxHash, U256};
use anyhow::Result;
use async_trait::async_trait;

/// Read side of the marketplace contract.
///
/// Implementations only perform the call; whether a method may be called is
/// decided by the caller through [`MarketplaceReader::capabilities`].
#[async_trait]
pub trait MarketplaceReader: Send + Sync {
    /// Capability set resolved when the connection was made
    fn capabilities(&self) -> &ContractCapabilities;

    /// Contract name, used as a liveness probe when connecting
    async fn contract_name(&self) -> Result<String>;

    async fn listed_property_ids(&self) -> Result<Vec<U256>>;
    async fn active_external_listing_ids(&self) -> Result<Vec<U256>>;
    async fn user_property_ids(&self, user: Address) -> Result<Vec<U256>>;
    async fn user_external_listing_ids(&self, user: Address) -> Result<Vec<U256>>;

    async fn property_exists(&self, token_id: U256) -> Result<bool>;
    async fn external_listing_exists(&self, listing_id: U256) -> Result<bool>;

    /// Property details together with the oracle USD price (8 decimals)
    async fn property_with_usd_price(&self, token_id: U256) -> Result<(PropertyDetails, U256)>;
    async fn property(&self, token_id: U256) -> Result<PropertyDetails>;

    /// External listing details together with the oracle USD price (8 decimals)
    async fn external_listing_with_usd_price(
        &self,
        listing_id: U256,
    ) -> Result<(ExternalListingDetails, U256)>;
    async fn external_listing(&self, listing_id: U256) -> Result<ExternalListingDetails>;

    /// Native-currency balance held by the contract, in wei
    async fn contract_balance(&self) -> Result<U256>;
}

/// Write side: the wallet that estimates, signs and submits transactions.
///
/// Errors keep the provider's numeric code so callers can classify them.
#[async_trait]
pub trait MarketplaceWriter: Send + Sync {
    /// Accounts the wallet currently authorizes for this client
    async fn accounts(&self) -> Result<Vec<Address>, RpcError>;

    async fn estimate_gas(&self, from: Address, call: &ContractCall) -> Result<U256, RpcError>;

    async fn submit(
        &self,
        from: Address,
        call: &ContractCall,
        gas_limit: U256,
    ) -> Result<TxHash, RpcError>;

    /// Wait until the transaction is mined
    async fn wait_for_receipt(&self, hash: TxHash) -> Result<TxReceipt, RpcError>;
}
