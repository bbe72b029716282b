//! State-changing actions.
//!
//! Every action walks the same stages:
//! `Idle -> Validating -> UploadingImage -> EstimatingGas -> Submitted -> Confirmed | Failed`.
//! Validation and upload failures stop before anything reaches the chain.

use crate::contract::types::{ContractCall, ExternalNftParams, PropertyParams, TxReceipt};
use crate::contract::{ContractCapabilities, MarketplaceWriter, Method};
use crate::error::{MutationError, TxError, TxVerb};
use crate::models::{ExternalNftForm, ImageFile, PropertyForm};
use crate::price::parse_eth;
use crate::upload::ImagePinner;
use alloy_primitives::{Address, U256};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// A user-initiated write
#[derive(Debug, Clone)]
pub enum Action {
    CreateListing {
        form: PropertyForm,
        image: Option<ImageFile>,
    },
    ListExternal {
        form: ExternalNftForm,
        image: Option<ImageFile>,
    },
    PurchaseInternal {
        token_id: U256,
        price_in_wei: U256,
    },
    PurchaseExternal {
        listing_id: U256,
        price_in_wei: U256,
    },
    WithdrawFees,
}

impl Action {
    fn verb(&self) -> TxVerb {
        match self {
            Action::CreateListing { .. } | Action::ListExternal { .. } => TxVerb::Transaction,
            Action::PurchaseInternal { .. } | Action::PurchaseExternal { .. } => TxVerb::Purchase,
            Action::WithdrawFees => TxVerb::Withdraw,
        }
    }

    fn success_message(&self) -> &'static str {
        match self {
            Action::CreateListing { .. } => "Property NFT created and listed successfully!",
            Action::ListExternal { .. } => "External NFT listed successfully!",
            Action::PurchaseInternal { .. } => "Property purchased successfully!",
            Action::PurchaseExternal { .. } => "External NFT purchased successfully!",
            Action::WithdrawFees => "Fees withdrawn successfully!",
        }
    }

    fn reload_targets(&self) -> Vec<ReloadTarget> {
        use ReloadTarget::*;
        match self {
            Action::CreateListing { .. } => vec![Marketplace, MyProperties],
            Action::ListExternal { .. } => vec![Marketplace, MyListings],
            Action::PurchaseInternal { .. } => vec![Marketplace, MyProperties, Balance],
            Action::PurchaseExternal { .. } => vec![Marketplace, MyListings, Balance],
            Action::WithdrawFees => vec![Balance],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MutationStage {
    Idle,
    Validating,
    UploadingImage,
    EstimatingGas,
    Submitted,
    Confirmed,
    Failed,
}

/// Display collection to refresh once a transaction is confirmed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ReloadTarget {
    Marketplace,
    MyProperties,
    MyListings,
    Balance,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadPlan {
    pub delay: Duration,
    pub targets: Vec<ReloadTarget>,
}

/// Successful end of an action
#[derive(Debug, Clone)]
pub struct Confirmation {
    pub message: String,
    pub receipt: TxReceipt,
    pub reload: ReloadPlan,
    pub stages: Vec<MutationStage>,
}

/// Failed end of an action, with the stage it stopped in
#[derive(Debug)]
pub struct MutationFailure {
    pub stage: MutationStage,
    pub error: MutationError,
    pub stages: Vec<MutationStage>,
}

impl MutationFailure {
    /// True when nothing was sent to the chain
    pub fn before_chain(&self) -> bool {
        matches!(
            self.stage,
            MutationStage::Idle | MutationStage::Validating | MutationStage::UploadingImage
        )
    }
}

impl fmt::Display for MutationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for MutationFailure {}

struct StageTracker {
    stages: Vec<MutationStage>,
}

impl StageTracker {
    fn new() -> Self {
        Self {
            stages: vec![MutationStage::Idle],
        }
    }

    fn enter(&mut self, stage: MutationStage) {
        debug!("Mutation stage: {:?}", stage);
        self.stages.push(stage);
    }

    fn current(&self) -> MutationStage {
        *self.stages.last().unwrap_or(&MutationStage::Idle)
    }

    fn fail(mut self, error: impl Into<MutationError>) -> MutationFailure {
        let error = error.into();
        let stage = self.current();
        error!("Mutation failed while {:?}: {}", stage, error);
        self.stages.push(MutationStage::Failed);
        MutationFailure {
            stage,
            error,
            stages: self.stages,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub owner: Address,
    pub gas_headroom_percent: u64,
    pub max_image_bytes: usize,
    pub reload_delay: Duration,
}

pub struct MutationOrchestrator {
    writer: Arc<dyn MarketplaceWriter>,
    pinner: Arc<dyn ImagePinner>,
    capabilities: ContractCapabilities,
    settings: OrchestratorSettings,
}

impl MutationOrchestrator {
    pub fn new(
        writer: Arc<dyn MarketplaceWriter>,
        pinner: Arc<dyn ImagePinner>,
        capabilities: ContractCapabilities,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            writer,
            pinner,
            capabilities,
            settings,
        }
    }

    pub fn is_owner(&self, account: Option<Address>) -> bool {
        account == Some(self.settings.owner)
    }

    /// Run one action from validation to confirmation
    pub async fn execute(
        &self,
        account: Option<Address>,
        action: Action,
    ) -> Result<Confirmation, MutationFailure> {
        let mut tracker = StageTracker::new();
        let verb = action.verb();

        tracker.enter(MutationStage::Validating);
        let from = match self.validate(account, &action).await {
            Ok(from) => from,
            Err(e) => return Err(tracker.fail(e)),
        };

        let call = match self.prepare(&action, &mut tracker).await {
            Ok(call) => call,
            Err(e) => return Err(tracker.fail(e)),
        };

        tracker.enter(MutationStage::EstimatingGas);
        debug!("Estimating gas for {}", call.method().abi_name());
        let estimate = match self.writer.estimate_gas(from, &call).await {
            Ok(gas) => gas,
            Err(e) => return Err(tracker.fail(TxError::classify(&e, verb))),
        };
        let gas_limit = estimate * U256::from(self.settings.gas_headroom_percent) / U256::from(100);
        debug!("Gas estimate {} -> limit {}", estimate, gas_limit);

        let hash = match self.writer.submit(from, &call, gas_limit).await {
            Ok(hash) => hash,
            Err(e) => return Err(tracker.fail(TxError::classify(&e, verb))),
        };
        tracker.enter(MutationStage::Submitted);
        info!("Transaction submitted! Waiting for confirmation... ({})", hash);

        let receipt = match self.writer.wait_for_receipt(hash).await {
            Ok(receipt) => receipt,
            Err(e) => return Err(tracker.fail(TxError::classify(&e, verb))),
        };
        if !receipt.success {
            return Err(tracker.fail(TxError::failed(verb, "transaction reverted")));
        }

        tracker.enter(MutationStage::Confirmed);
        info!("{}", action.success_message());

        Ok(Confirmation {
            message: action.success_message().to_string(),
            receipt,
            reload: ReloadPlan {
                delay: self.settings.reload_delay,
                targets: action.reload_targets(),
            },
            stages: tracker.stages,
        })
    }

    fn require(&self, method: Method, feature: &'static str) -> Result<(), MutationError> {
        if self.capabilities.supports(method) {
            Ok(())
        } else {
            Err(MutationError::Unsupported(feature))
        }
    }

    /// Checks that need no upload; returns the sending account
    async fn validate(&self, account: Option<Address>, action: &Action) -> Result<Address, MutationError> {
        match action {
            Action::CreateListing { form, image } => {
                self.require(Method::MintProperty, "Property creation")?;
                self.validate_image(image.as_ref())?;
                if form.name.trim().is_empty() {
                    return Err(MutationError::validation("Property name is required"));
                }
                if form.property_address.trim().is_empty() {
                    return Err(MutationError::validation("Property address is required"));
                }
                positive_price(&form.price_in_eth)?;
            }
            Action::ListExternal { form, image } => {
                self.require(Method::ListExternalNft, "External NFT listing")?;
                self.validate_image(image.as_ref())?;
                if form.nft_contract.trim().is_empty() {
                    return Err(MutationError::validation("NFT contract address is required"));
                }
                nft_contract(&form.nft_contract)?;
                if form.token_id.trim().is_empty() {
                    return Err(MutationError::validation("Token ID is required"));
                }
                token_id(&form.token_id)?;
                if form.name.trim().is_empty() {
                    return Err(MutationError::validation("NFT name is required"));
                }
                positive_price(&form.price_in_eth)?;
            }
            Action::PurchaseInternal { .. } => {
                self.require(Method::PurchaseProperty, "Property purchasing")?;
            }
            Action::PurchaseExternal { .. } => {
                self.require(Method::PurchaseExternalNft, "External NFT purchasing")?;
            }
            Action::WithdrawFees => {
                if account.is_none() {
                    return Err(MutationError::NotConnected);
                }
                if !self.is_owner(account) {
                    return Err(MutationError::NotOwner);
                }
                self.require(Method::WithdrawFees, "Withdrawing fees")?;
            }
        }

        let account = account.ok_or(MutationError::NotConnected)?;
        self.ensure_authorized(account, action.verb()).await?;
        Ok(account)
    }

    fn validate_image(&self, image: Option<&ImageFile>) -> Result<(), MutationError> {
        let image = image.ok_or_else(|| MutationError::validation("Please select an image"))?;
        if !image.content_type.starts_with("image/") {
            return Err(MutationError::validation(
                "Please select a valid image file (JPEG, PNG, GIF, etc.)",
            ));
        }
        if image.len() > self.settings.max_image_bytes {
            return Err(MutationError::validation(format!(
                "File size must be less than {}MB",
                self.settings.max_image_bytes / (1024 * 1024)
            )));
        }
        Ok(())
    }

    /// The wallet must still expose the account the session connected with
    async fn ensure_authorized(&self, account: Address, verb: TxVerb) -> Result<(), MutationError> {
        let accounts = self
            .writer
            .accounts()
            .await
            .map_err(|e| TxError::classify(&e, verb))?;
        if accounts.contains(&account) {
            Ok(())
        } else {
            Err(MutationError::AccountAccessLost)
        }
    }

    /// Upload the image if the action has one and build the contract call
    async fn prepare(
        &self,
        action: &Action,
        tracker: &mut StageTracker,
    ) -> Result<ContractCall, MutationError> {
        match action {
            Action::CreateListing { form, image } => {
                tracker.enter(MutationStage::UploadingImage);
                let image_uri = self.upload(image.as_ref()).await?;
                Ok(ContractCall::MintProperty(PropertyParams {
                    name: form.name.trim().to_string(),
                    description: form.description.trim().to_string(),
                    property_address: form.property_address.trim().to_string(),
                    owner_details: form.owner_details.trim().to_string(),
                    image_uri,
                    price_in_wei: positive_price(&form.price_in_eth)?,
                }))
            }
            Action::ListExternal { form, image } => {
                tracker.enter(MutationStage::UploadingImage);
                let image_uri = self.upload(image.as_ref()).await?;
                Ok(ContractCall::ListExternalNft(ExternalNftParams {
                    nft_contract: nft_contract(&form.nft_contract)?,
                    token_id: token_id(&form.token_id)?,
                    name: form.name.trim().to_string(),
                    description: form.description.trim().to_string(),
                    property_address: form.property_address.trim().to_string(),
                    owner_details: form.owner_details.trim().to_string(),
                    image_uri,
                    price_in_wei: positive_price(&form.price_in_eth)?,
                }))
            }
            Action::PurchaseInternal {
                token_id,
                price_in_wei,
            } => Ok(ContractCall::PurchaseProperty {
                token_id: *token_id,
                value: *price_in_wei,
            }),
            Action::PurchaseExternal {
                listing_id,
                price_in_wei,
            } => Ok(ContractCall::PurchaseExternalNft {
                listing_id: *listing_id,
                value: *price_in_wei,
            }),
            Action::WithdrawFees => Ok(ContractCall::WithdrawFees),
        }
    }

    async fn upload(&self, image: Option<&ImageFile>) -> Result<String, MutationError> {
        let image = image.ok_or_else(|| MutationError::validation("Please select an image"))?;
        info!("Uploading image to IPFS...");
        let url = self.pinner.pin(image).await?;
        info!("Image uploaded: {}", url);
        Ok(url)
    }
}

fn positive_price(input: &str) -> Result<U256, MutationError> {
    match parse_eth(input) {
        Ok(wei) if !wei.is_zero() => Ok(wei),
        _ => Err(MutationError::validation("Please enter a valid price greater than 0")),
    }
}

fn nft_contract(input: &str) -> Result<Address, MutationError> {
    input
        .trim()
        .parse()
        .map_err(|_| MutationError::validation("Invalid NFT contract address"))
}

fn token_id(input: &str) -> Result<U256, MutationError> {
    U256::from_str_radix(input.trim(), 10).map_err(|_| MutationError::validation("Invalid token ID"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_validation() {
        assert!(positive_price("0").is_err());
        assert!(positive_price("").is_err());
        assert!(positive_price("-2").is_err());
        assert_eq!(
            positive_price("0.25").unwrap(),
            U256::from(250_000_000_000_000_000u128)
        );
    }

    #[test]
    fn test_reload_targets() {
        let purchase = Action::PurchaseInternal {
            token_id: U256::from(1),
            price_in_wei: U256::from(1),
        };
        assert_eq!(
            purchase.reload_targets(),
            vec![ReloadTarget::Marketplace, ReloadTarget::MyProperties, ReloadTarget::Balance]
        );
        assert_eq!(Action::WithdrawFees.reload_targets(), vec![ReloadTarget::Balance]);
    }

    #[test]
    fn test_nft_contract_parsing() {
        assert!(nft_contract("0x0A47388e92d2c5aFF354CbCCC41fb8f80a0ef9Db").is_ok());
        assert!(nft_contract("0x1234").is_err());
        assert!(token_id("12").is_ok());
        assert!(token_id("twelve").is_err());
    }
}
