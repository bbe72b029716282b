use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, warn};

/// Contract methods the client knows how to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Method {
    Name,
    GetListedProperties,
    GetActiveExternalListings,
    GetUserProperties,
    GetUserExternalListings,
    PropertyExists,
    ExternalListingExists,
    GetPropertyWithUsdPrice,
    GetExternalListingWithUsdPrice,
    Properties,
    ExternalListings,
    MintProperty,
    ListExternalNft,
    PurchaseProperty,
    PurchaseExternalNft,
    WithdrawFees,
}

impl Method {
    pub const ALL: [Method; 16] = [
        Method::Name,
        Method::GetListedProperties,
        Method::GetActiveExternalListings,
        Method::GetUserProperties,
        Method::GetUserExternalListings,
        Method::PropertyExists,
        Method::ExternalListingExists,
        Method::GetPropertyWithUsdPrice,
        Method::GetExternalListingWithUsdPrice,
        Method::Properties,
        Method::ExternalListings,
        Method::MintProperty,
        Method::ListExternalNft,
        Method::PurchaseProperty,
        Method::PurchaseExternalNft,
        Method::WithdrawFees,
    ];

    /// Name of the method in the contract ABI
    pub fn abi_name(self) -> &'static str {
        match self {
            Method::Name => "name",
            Method::GetListedProperties => "getListedProperties",
            Method::GetActiveExternalListings => "getActiveExternalListings",
            Method::GetUserProperties => "getUserProperties",
            Method::GetUserExternalListings => "getUserExternalListings",
            Method::PropertyExists => "propertyExists",
            Method::ExternalListingExists => "externalListingExists",
            Method::GetPropertyWithUsdPrice => "getPropertyWithUSDPrice",
            Method::GetExternalListingWithUsdPrice => "getExternalListingWithUSDPrice",
            Method::Properties => "properties",
            Method::ExternalListings => "externalListings",
            Method::MintProperty => "mintProperty",
            Method::ListExternalNft => "listExternalNFT",
            Method::PurchaseProperty => "purchaseProperty",
            Method::PurchaseExternalNft => "purchaseExternalNFT",
            Method::WithdrawFees => "withdrawFees",
        }
    }
}

/// Report whether an ABI document declares a function with the given name.
///
/// Never fails: metadata that is not a JSON array of ABI entries counts as
/// "not supported".
pub fn supports(abi: &Value, method_name: &str) -> bool {
    let Some(entries) = abi.as_array() else {
        warn!("Contract ABI is not an array; treating {} as unsupported", method_name);
        return false;
    };

    entries.iter().any(|entry| {
        entry.get("type").and_then(Value::as_str) == Some("function")
            && entry.get("name").and_then(Value::as_str) == Some(method_name)
    })
}

/// Capability set of one contract deployment, resolved once per connection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContractCapabilities {
    methods: BTreeSet<Method>,
}

impl ContractCapabilities {
    /// Probe every known method against the ABI
    pub fn from_abi(abi: &Value) -> Self {
        let methods: BTreeSet<Method> = Method::ALL
            .into_iter()
            .filter(|m| supports(abi, m.abi_name()))
            .collect();

        for missing in Method::ALL.iter().filter(|m| !methods.contains(*m)) {
            debug!("Contract does not expose {}", missing.abi_name());
        }

        Self { methods }
    }

    pub fn from_abi_str(abi: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(abi).context("Contract ABI is not valid JSON")?;
        Ok(Self::from_abi(&value))
    }

    pub fn from_abi_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read contract ABI from {}", path.display()))?;
        Self::from_abi_str(&raw)
    }

    /// Build a capability set from an explicit method list
    pub fn with_methods(methods: impl IntoIterator<Item = Method>) -> Self {
        Self {
            methods: methods.into_iter().collect(),
        }
    }

    /// Every method, as exposed by the current contract version
    pub fn full() -> Self {
        Self::with_methods(Method::ALL)
    }

    pub fn supports(&self, method: Method) -> bool {
        self.methods.contains(&method)
    }

    pub fn methods(&self) -> impl Iterator<Item = Method> + '_ {
        self.methods.iter().copied()
    }

    pub fn has_usd_pricing(&self) -> bool {
        self.supports(Method::GetPropertyWithUsdPrice)
            || self.supports(Method::GetExternalListingWithUsdPrice)
    }

    pub fn has_external_listings(&self) -> bool {
        self.supports(Method::GetActiveExternalListings)
    }

    pub fn can_list_external(&self) -> bool {
        self.supports(Method::ListExternalNft)
    }

    pub fn can_purchase_external(&self) -> bool {
        self.supports(Method::PurchaseExternalNft)
    }

    pub fn can_load_user_external(&self) -> bool {
        self.supports(Method::GetUserExternalListings)
    }

    pub fn can_withdraw_fees(&self) -> bool {
        self.supports(Method::WithdrawFees)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_supports_finds_function_entries_only() {
        let abi = json!([
            { "type": "function", "name": "getListedProperties", "inputs": [], "outputs": [] },
            { "type": "event", "name": "PropertyMinted", "inputs": [] },
        ]);

        assert!(supports(&abi, "getListedProperties"));
        assert!(!supports(&abi, "PropertyMinted"));
        assert!(!supports(&abi, "withdrawFees"));
    }

    #[test]
    fn test_supports_tolerates_malformed_metadata() {
        assert!(!supports(&json!({ "abi": [] }), "name"));
        assert!(!supports(&json!(null), "name"));
        assert!(!supports(&json!([1, "two", { "name": 3 }]), "name"));
    }

    #[test]
    fn test_capabilities_from_legacy_abi() {
        let abi = json!([
            { "type": "function", "name": "name" },
            { "type": "function", "name": "getListedProperties" },
            { "type": "function", "name": "properties" },
            { "type": "function", "name": "mintProperty" },
            { "type": "function", "name": "purchaseProperty" },
        ]);
        let caps = ContractCapabilities::from_abi(&abi);

        assert!(caps.supports(Method::Properties));
        assert!(!caps.has_usd_pricing());
        assert!(!caps.has_external_listings());
        assert!(!caps.can_withdraw_fees());
    }

    #[test]
    fn test_invalid_abi_json_is_an_error() {
        assert!(ContractCapabilities::from_abi_str("not json").is_err());
    }
}
