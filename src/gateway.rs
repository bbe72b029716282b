//! Content-identifier to gateway URL resolution.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_PLACEHOLDER: &str = "https://via.placeholder.com/400x250?text=Property+Image";

pub const DEFAULT_GATEWAYS: [&str; 5] = [
    "https://gateway.pinata.cloud/ipfs/",
    "https://ipfs.io/ipfs/",
    "https://cloudflare-ipfs.com/ipfs/",
    "https://dweb.link/ipfs/",
    "https://gateway.ipfs.io/ipfs/",
];

const IPFS_PATH: &str = "/ipfs/";
const IPFS_SCHEME: &str = "ipfs://";
const HASH_MARKERS: [&str; 2] = ["Qm", "bafy"];

/// How the known mirror gateways are used
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MirrorPolicy {
    /// Always answer with the first gateway
    #[default]
    Canonical,
    /// Try gateways in order and keep the first one that answers
    OrderedFailover,
}

/// Turns the image field of a listing into a fetchable URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayResolver {
    gateways: Vec<String>,
    placeholder: String,
    policy: MirrorPolicy,
}

impl Default for GatewayResolver {
    fn default() -> Self {
        Self::new(
            DEFAULT_GATEWAYS.iter().map(|g| g.to_string()).collect(),
            DEFAULT_PLACEHOLDER.to_string(),
            MirrorPolicy::Canonical,
        )
    }
}

impl GatewayResolver {
    /// The first gateway is the canonical one. An empty list falls back to the defaults.
    pub fn new(gateways: Vec<String>, placeholder: String, policy: MirrorPolicy) -> Self {
        let gateways = if gateways.is_empty() {
            DEFAULT_GATEWAYS.iter().map(|g| g.to_string()).collect()
        } else {
            gateways
                .into_iter()
                .map(|g| if g.ends_with('/') { g } else { format!("{}/", g) })
                .collect()
        };

        Self {
            gateways,
            placeholder,
            policy,
        }
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn policy(&self) -> MirrorPolicy {
        self.policy
    }

    /// Canonical URL for the content, or the placeholder
    pub fn resolve(&self, uri: Option<&str>) -> String {
        match uri.and_then(content_hash) {
            Some(hash) => format!("{}{}", self.gateways[0], hash),
            None => self.placeholder.clone(),
        }
    }

    /// Gateway URLs to try in order. Only the canonical one unless failover is enabled.
    pub fn candidates(&self, uri: Option<&str>) -> Vec<String> {
        let Some(hash) = uri.and_then(content_hash) else {
            return vec![self.placeholder.clone()];
        };

        let gateways = match self.policy {
            MirrorPolicy::Canonical => &self.gateways[..1],
            MirrorPolicy::OrderedFailover => &self.gateways[..],
        };

        gateways.iter().map(|g| format!("{}{}", g, hash)).collect()
    }

    /// First candidate the probe accepts, falling back to the canonical URL
    pub async fn resolve_reachable(&self, probe: &dyn GatewayProbe, uri: Option<&str>) -> String {
        let candidates = self.candidates(uri);
        if candidates.len() == 1 {
            return self.resolve(uri);
        }

        for url in candidates {
            if probe.is_reachable(&url).await {
                return url;
            }
        }

        debug!("No gateway answered; keeping the canonical URL");
        self.resolve(uri)
    }
}

/// Reachability check for one gateway URL
#[async_trait]
pub trait GatewayProbe: Send + Sync {
    async fn is_reachable(&self, url: &str) -> bool;
}

/// Probe that sends a HEAD request
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl GatewayProbe for HttpProbe {
    async fn is_reachable(&self, url: &str) -> bool {
        match self.client.head(url).send().await {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                debug!("Gateway {} answered {}", url, resp.status());
                false
            }
            Err(e) => {
                debug!("Gateway {} unreachable: {}", url, e);
                false
            }
        }
    }
}

/// Extract the content hash from any of the accepted forms
pub fn content_hash(uri: &str) -> Option<&str> {
    let hash = if uri.contains(IPFS_PATH) {
        uri.split(IPFS_PATH).nth(1)?
    } else if let Some(rest) = uri.strip_prefix(IPFS_SCHEME) {
        rest
    } else if HASH_MARKERS.iter().any(|m| uri.contains(m)) {
        uri
    } else {
        return None;
    };

    if hash.is_empty() {
        None
    } else {
        Some(hash)
    }
}
