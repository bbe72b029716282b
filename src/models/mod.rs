use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which namespace a listing identifier belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Namespace {
    /// Property tokens minted by the marketplace contract itself
    Internal,
    /// NFTs owned by another contract and listed through the marketplace
    External,
}

/// Property as stored by the marketplace contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDetails {
    pub name: String,
    pub description: String,
    pub property_address: String,
    pub owner_details: String,
    pub image_uri: String,
    pub price_in_wei: U256,
    pub owner: Address,
    pub exists: bool,
    pub is_listed: bool,
    pub is_sold: bool,
}

/// Externally owned NFT made purchasable through the marketplace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalListingDetails {
    pub nft_contract: Address,
    pub token_id: U256,
    pub name: String,
    pub description: String,
    pub property_address: String,
    pub owner_details: String,
    pub image_uri: String,
    pub price_in_wei: U256,
    pub owner: Address,
    pub exists: bool,
    pub is_active: bool,
    pub is_sold: bool,
}

/// Identity of a record in the merged display list.
///
/// The identifiers live inside the variant, so a record can never claim to be
/// internal while carrying a listing id or the other way around.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "namespace", rename_all = "kebab-case")]
pub enum ListingKind {
    Internal {
        #[serde(rename = "tokenId")]
        token_id: String,
    },
    External {
        #[serde(rename = "listingId")]
        listing_id: String,
        #[serde(rename = "nftContract")]
        nft_contract: Address,
        #[serde(rename = "externalTokenId")]
        external_token_id: String,
    },
}

/// Display-ready projection shared by both listing shapes.
///
/// `isInternal` is written out for consumers of the JSON but never read back:
/// on input it is derived from the namespace tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", from = "RecordInput")]
pub struct ListingRecord {
    #[serde(flatten)]
    pub kind: ListingKind,
    is_internal: bool,
    pub name: String,
    pub description: String,
    pub property_address: String,
    pub owner_details: String,
    pub image_url: String,
    /// Decimal integer string, 18 decimals
    pub price_in_wei: String,
    /// Decimal integer string, 8 decimals; "0" when no oracle price was available
    pub price_in_usd: String,
    pub owner: Address,
    pub exists: bool,
    /// `isListed` for internal records, `isActive` for external ones
    pub is_active: bool,
    pub is_sold: bool,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordInput {
    #[serde(flatten)]
    kind: ListingKind,
    name: String,
    description: String,
    property_address: String,
    owner_details: String,
    image_url: String,
    price_in_wei: String,
    price_in_usd: String,
    owner: Address,
    exists: bool,
    is_active: bool,
    is_sold: bool,
    loaded_at: DateTime<Utc>,
}

impl From<RecordInput> for ListingRecord {
    fn from(input: RecordInput) -> Self {
        Self {
            is_internal: matches!(input.kind, ListingKind::Internal { .. }),
            kind: input.kind,
            name: input.name,
            description: input.description,
            property_address: input.property_address,
            owner_details: input.owner_details,
            image_url: input.image_url,
            price_in_wei: input.price_in_wei,
            price_in_usd: input.price_in_usd,
            owner: input.owner,
            exists: input.exists,
            is_active: input.is_active,
            is_sold: input.is_sold,
            loaded_at: input.loaded_at,
        }
    }
}

impl ListingRecord {
    /// Project an internal property into a display record
    pub fn from_property(
        token_id: U256,
        details: PropertyDetails,
        price_in_usd: U256,
        image_url: String,
    ) -> Self {
        Self {
            kind: ListingKind::Internal {
                token_id: token_id.to_string(),
            },
            is_internal: true,
            name: details.name,
            description: details.description,
            property_address: details.property_address,
            owner_details: details.owner_details,
            image_url,
            price_in_wei: details.price_in_wei.to_string(),
            price_in_usd: price_in_usd.to_string(),
            owner: details.owner,
            exists: details.exists,
            is_active: details.is_listed,
            is_sold: details.is_sold,
            loaded_at: Utc::now(),
        }
    }

    /// Project an external listing into a display record
    pub fn from_external(
        listing_id: U256,
        details: ExternalListingDetails,
        price_in_usd: U256,
        image_url: String,
    ) -> Self {
        Self {
            kind: ListingKind::External {
                listing_id: listing_id.to_string(),
                nft_contract: details.nft_contract,
                external_token_id: details.token_id.to_string(),
            },
            is_internal: false,
            name: details.name,
            description: details.description,
            property_address: details.property_address,
            owner_details: details.owner_details,
            image_url,
            price_in_wei: details.price_in_wei.to_string(),
            price_in_usd: price_in_usd.to_string(),
            owner: details.owner,
            exists: details.exists,
            is_active: details.is_active,
            is_sold: details.is_sold,
            loaded_at: Utc::now(),
        }
    }

    pub fn namespace(&self) -> Namespace {
        match self.kind {
            ListingKind::Internal { .. } => Namespace::Internal,
            ListingKind::External { .. } => Namespace::External,
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self.kind, ListingKind::Internal { .. })
    }

    /// Identifier within the record's namespace
    pub fn id(&self) -> &str {
        match &self.kind {
            ListingKind::Internal { token_id } => token_id,
            ListingKind::External { listing_id, .. } => listing_id,
        }
    }

    /// Contract holding the NFT behind an external listing
    pub fn nft_contract(&self) -> Option<Address> {
        match &self.kind {
            ListingKind::Internal { .. } => None,
            ListingKind::External { nft_contract, .. } => Some(*nft_contract),
        }
    }

    /// Addresses compare by bytes, so checksum casing never matters here
    pub fn is_owned_by(&self, account: Address) -> bool {
        self.owner == account
    }
}

/// Form input for minting a new property
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyForm {
    pub name: String,
    pub description: String,
    pub property_address: String,
    pub owner_details: String,
    pub price_in_eth: String,
}

/// Form input for listing an NFT held by another contract
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalNftForm {
    pub nft_contract: String,
    pub token_id: String,
    pub name: String,
    pub description: String,
    pub property_address: String,
    pub owner_details: String,
    pub price_in_eth: String,
}

/// Image selected for upload
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
