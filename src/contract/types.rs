use crate::contract::abi::IPropertyMarketplace;
use crate::contract::capabilities::Method;
use alloy_primitives::{Address, Bytes, TxHash, U256};
use alloy_sol_types::SolCall;
use serde::{Deserialize, Serialize};

/// Fields of a property to mint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyParams {
    pub name: String,
    pub description: String,
    pub property_address: String,
    pub owner_details: String,
    pub image_uri: String,
    pub price_in_wei: U256,
}

/// Fields of an external NFT to list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalNftParams {
    pub nft_contract: Address,
    pub token_id: U256,
    pub name: String,
    pub description: String,
    pub property_address: String,
    pub owner_details: String,
    pub image_uri: String,
    pub price_in_wei: U256,
}

/// A state-changing contract call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractCall {
    MintProperty(PropertyParams),
    ListExternalNft(ExternalNftParams),
    PurchaseProperty { token_id: U256, value: U256 },
    PurchaseExternalNft { listing_id: U256, value: U256 },
    WithdrawFees,
}

impl ContractCall {
    pub fn method(&self) -> Method {
        match self {
            ContractCall::MintProperty(_) => Method::MintProperty,
            ContractCall::ListExternalNft(_) => Method::ListExternalNft,
            ContractCall::PurchaseProperty { .. } => Method::PurchaseProperty,
            ContractCall::PurchaseExternalNft { .. } => Method::PurchaseExternalNft,
            ContractCall::WithdrawFees => Method::WithdrawFees,
        }
    }

    /// Wei attached to the call
    pub fn value(&self) -> U256 {
        match self {
            ContractCall::PurchaseProperty { value, .. }
            | ContractCall::PurchaseExternalNft { value, .. } => *value,
            _ => U256::ZERO,
        }
    }

    /// ABI-encoded calldata
    pub fn calldata(&self) -> Bytes {
        let encoded = match self {
            ContractCall::MintProperty(p) => IPropertyMarketplace::mintPropertyCall {
                params: IPropertyMarketplace::PropertyParams {
                    name: p.name.clone(),
                    description: p.description.clone(),
                    propertyAddress: p.property_address.clone(),
                    ownerDetails: p.owner_details.clone(),
                    imageURI: p.image_uri.clone(),
                    priceInWei: p.price_in_wei,
                },
            }
            .abi_encode(),
            ContractCall::ListExternalNft(p) => IPropertyMarketplace::listExternalNFTCall {
                params: IPropertyMarketplace::ExternalNFTParams {
                    nftContract: p.nft_contract,
                    tokenId: p.token_id,
                    name: p.name.clone(),
                    description: p.description.clone(),
                    propertyAddress: p.property_address.clone(),
                    ownerDetails: p.owner_details.clone(),
                    imageURI: p.image_uri.clone(),
                    priceInWei: p.price_in_wei,
                },
            }
            .abi_encode(),
            ContractCall::PurchaseProperty { token_id, .. } => {
                IPropertyMarketplace::purchasePropertyCall { tokenId: *token_id }.abi_encode()
            }
            ContractCall::PurchaseExternalNft { listing_id, .. } => {
                IPropertyMarketplace::purchaseExternalNFTCall {
                    listingId: *listing_id,
                }
                .abi_encode()
            }
            ContractCall::WithdrawFees => IPropertyMarketplace::withdrawFeesCall {}.abi_encode(),
        };
        Bytes::from(encoded)
    }
}

/// Outcome of a mined transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub hash: TxHash,
    pub success: bool,
    pub block_number: Option<u64>,
}
