use crate::gateway::{MirrorPolicy, DEFAULT_GATEWAYS, DEFAULT_PLACEHOLDER};
use crate::loader::FallbackPolicy;
use crate::price::ZeroPricePolicy;
use alloy_primitives::{address, Address};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const ENV_PREFIX: &str = "PROPERTY_MARKET_";

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// JSON-RPC endpoint of the node/wallet
    pub rpc_url: String,
    /// Deployed marketplace contract
    pub contract_address: Address,
    /// Account allowed to withdraw fees
    pub owner_address: Address,
    /// ABI used to resolve the contract's capabilities
    pub abi_path: PathBuf,
    /// IPFS gateways, canonical first
    pub gateways: Vec<String>,
    pub placeholder_image: String,
    pub mirror_policy: MirrorPolicy,
    pub fallback_policy: FallbackPolicy,
    pub zero_price_policy: ZeroPricePolicy,
    /// Delay before reloading after a confirmed transaction
    pub reload_delay_ms: u64,
    /// Gas limit as a percentage of the estimate
    pub gas_headroom_percent: u64,
    pub max_image_bytes: usize,
    pub request_timeout_secs: u64,
    pub upload_timeout_secs: u64,
    pub receipt_poll_ms: u64,
    pub confirmation_timeout_secs: u64,
    pub upload: UploadConfig,
}

/// Pinning service endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub api_url: String,
    /// Server endpoint issuing short-lived upload tokens
    pub token_endpoint: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.pinata.cloud".to_string(),
            token_endpoint: "http://127.0.0.1:3001/api/upload-token".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            contract_address: address!("0A47388e92d2c5aFF354CbCCC41fb8f80a0ef9Db"),
            owner_address: address!("7f21d6db0b059496ee1c0810898e35c125a714ab"),
            abi_path: PathBuf::from("abi/PropertyNFTMarketplace.json"),
            gateways: DEFAULT_GATEWAYS.iter().map(|g| g.to_string()).collect(),
            placeholder_image: DEFAULT_PLACEHOLDER.to_string(),
            mirror_policy: MirrorPolicy::default(),
            fallback_policy: FallbackPolicy::default(),
            zero_price_policy: ZeroPricePolicy::default(),
            reload_delay_ms: 3_000,
            gas_headroom_percent: 120,
            max_image_bytes: 10 * 1024 * 1024,
            request_timeout_secs: 30,
            upload_timeout_secs: 60,
            receipt_poll_ms: 1_000,
            confirmation_timeout_secs: 300,
            upload: UploadConfig::default(),
        }
    }
}

impl Config {
    /// Defaults, then the JSON file if given, then `.env` and environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if dotenv::dotenv().is_ok() {
            debug!("Loaded .env file");
        }
        config.apply_env(|key| std::env::var(key).ok())?;

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply `PROPERTY_MARKET_*` overrides read through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(url) = get("RPC_URL") {
            self.rpc_url = url;
        }
        if let Some(addr) = get("CONTRACT_ADDRESS") {
            self.contract_address = addr
                .parse()
                .with_context(|| format!("Invalid {}CONTRACT_ADDRESS", ENV_PREFIX))?;
        }
        if let Some(addr) = get("OWNER_ADDRESS") {
            self.owner_address = addr
                .parse()
                .with_context(|| format!("Invalid {}OWNER_ADDRESS", ENV_PREFIX))?;
        }
        if let Some(path) = get("ABI_PATH") {
            self.abi_path = PathBuf::from(path);
        }
        if let Some(endpoint) = get("UPLOAD_TOKEN_ENDPOINT") {
            self.upload.token_endpoint = endpoint;
        }
        if let Some(policy) = get("FALLBACK_POLICY") {
            self.fallback_policy = serde_json::from_value(serde_json::Value::String(policy))
                .with_context(|| format!("Invalid {}FALLBACK_POLICY", ENV_PREFIX))?;
        }
        Ok(())
    }

    pub fn reload_delay(&self) -> Duration {
        Duration::from_millis(self.reload_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_ms)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_match_deployment() {
        let config = Config::default();
        assert_eq!(config.reload_delay(), Duration::from_secs(3));
        assert_eq!(config.gas_headroom_percent, 120);
        assert_eq!(config.max_image_bytes, 10 * 1024 * 1024);
        assert_eq!(config.fallback_policy, FallbackPolicy::Resilient);
        assert_eq!(config.gateways[0], "https://gateway.pinata.cloud/ipfs/");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "rpc_url": "http://node:8545", "fallback_policy": "direct", "upload": {{ "api_url": "https://pin.example" }} }}"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.rpc_url, "http://node:8545");
        assert_eq!(config.fallback_policy, FallbackPolicy::Direct);
        assert_eq!(config.upload.api_url, "https://pin.example");
        assert_eq!(config.reload_delay_ms, 3_000);
        assert!(config.upload.token_endpoint.ends_with("/api/upload-token"));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("PROPERTY_MARKET_RPC_URL", "http://other:8545"),
            ("PROPERTY_MARKET_OWNER_ADDRESS", "0x1111111111111111111111111111111111111111"),
            ("PROPERTY_MARKET_FALLBACK_POLICY", "direct"),
        ]);
        let mut config = Config::default();
        config
            .apply_env(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.rpc_url, "http://other:8545");
        assert_eq!(config.owner_address, Address::repeat_byte(0x11));
        assert_eq!(config.fallback_policy, FallbackPolicy::Direct);
    }

    #[test]
    fn test_invalid_env_address_is_rejected() {
        let mut config = Config::default();
        let result = config.apply_env(|key| {
            (key == "PROPERTY_MARKET_CONTRACT_ADDRESS").then(|| "not-an-address".to_string())
        });
        assert!(result.is_err());
    }
}
