//! Solidity interface of the property marketplace contract.
//!
//! Covers every method the client may call. Whether a deployment actually
//! exposes a method is decided by [`ContractCapabilities`](super::ContractCapabilities),
//! not by this declaration.

use alloy_sol_types::sol;

use crate::models::{ExternalListingDetails, PropertyDetails};

sol! {
    interface IPropertyMarketplace {
        struct Property {
            string name;
            string description;
            string propertyAddress;
            string ownerDetails;
            string imageURI;
            uint256 priceInWei;
            address owner;
            bool exists;
            bool isListed;
            bool isSold;
        }

        struct ExternalListing {
            address nftContract;
            uint256 tokenId;
            string name;
            string description;
            string propertyAddress;
            string ownerDetails;
            string imageURI;
            uint256 priceInWei;
            address owner;
            bool exists;
            bool isActive;
            bool isSold;
        }

        struct PropertyParams {
            string name;
            string description;
            string propertyAddress;
            string ownerDetails;
            string imageURI;
            uint256 priceInWei;
        }

        struct ExternalNFTParams {
            address nftContract;
            uint256 tokenId;
            string name;
            string description;
            string propertyAddress;
            string ownerDetails;
            string imageURI;
            uint256 priceInWei;
        }

        function name() external view returns (string memory);

        function getListedProperties() external view returns (uint256[] memory);
        function getActiveExternalListings() external view returns (uint256[] memory);
        function getUserProperties(address user) external view returns (uint256[] memory);
        function getUserExternalListings(address user) external view returns (uint256[] memory);

        function propertyExists(uint256 tokenId) external view returns (bool);
        function externalListingExists(uint256 listingId) external view returns (bool);

        function getPropertyWithUSDPrice(uint256 tokenId) external view returns (Property memory property, uint256 priceInUSD);
        function getExternalListingWithUSDPrice(uint256 listingId) external view returns (ExternalListing memory listing, uint256 priceInUSD);

        function properties(uint256 tokenId) external view returns (
            string memory name,
            string memory description,
            string memory propertyAddress,
            string memory ownerDetails,
            string memory imageURI,
            uint256 priceInWei,
            address owner,
            bool exists,
            bool isListed,
            bool isSold
        );
        function externalListings(uint256 listingId) external view returns (
            address nftContract,
            uint256 tokenId,
            string memory name,
            string memory description,
            string memory propertyAddress,
            string memory ownerDetails,
            string memory imageURI,
            uint256 priceInWei,
            address owner,
            bool exists,
            bool isActive,
            bool isSold
        );

        function mintProperty(PropertyParams calldata params) external returns (uint256);
        function listExternalNFT(ExternalNFTParams calldata params) external returns (uint256);
        function purchaseProperty(uint256 tokenId) external payable;
        function purchaseExternalNFT(uint256 listingId) external payable;
        function withdrawFees() external;
    }
}

impl From<IPropertyMarketplace::Property> for PropertyDetails {
    fn from(p: IPropertyMarketplace::Property) -> Self {
        Self {
            name: p.name,
            description: p.description,
            property_address: p.propertyAddress,
            owner_details: p.ownerDetails,
            image_uri: p.imageURI,
            price_in_wei: p.priceInWei,
            owner: p.owner,
            exists: p.exists,
            is_listed: p.isListed,
            is_sold: p.isSold,
        }
    }
}

impl From<IPropertyMarketplace::propertiesReturn> for PropertyDetails {
    fn from(p: IPropertyMarketplace::propertiesReturn) -> Self {
        Self {
            name: p.name,
            description: p.description,
            property_address: p.propertyAddress,
            owner_details: p.ownerDetails,
            image_uri: p.imageURI,
            price_in_wei: p.priceInWei,
            owner: p.owner,
            exists: p.exists,
            is_listed: p.isListed,
            is_sold: p.isSold,
        }
    }
}

impl From<IPropertyMarketplace::ExternalListing> for ExternalListingDetails {
    fn from(l: IPropertyMarketplace::ExternalListing) -> Self {
        Self {
            nft_contract: l.nftContract,
            token_id: l.tokenId,
            name: l.name,
            description: l.description,
            property_address: l.propertyAddress,
            owner_details: l.ownerDetails,
            image_uri: l.imageURI,
            price_in_wei: l.priceInWei,
            owner: l.owner,
            exists: l.exists,
            is_active: l.isActive,
            is_sold: l.isSold,
        }
    }
}

impl From<IPropertyMarketplace::externalListingsReturn> for ExternalListingDetails {
    fn from(l: IPropertyMarketplace::externalListingsReturn) -> Self {
        Self {
            nft_contract: l.nftContract,
            token_id: l.tokenId,
            name: l.name,
            description: l.description,
            property_address: l.propertyAddress,
            owner_details: l.ownerDetails,
            image_uri: l.imageURI,
            price_in_wei: l.priceInWei,
            owner: l.owner,
            exists: l.exists,
            is_active: l.isActive,
            is_sold: l.isSold,
        }
    }
}
