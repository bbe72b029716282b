//! Listing loader.
//!
//! Reads identifier lists from the contract, fetches every item through the
//! best accessor the deployment offers, filters by visibility and merges
//! internal properties with external listings into one display list.
//! Missing optional methods and per-item failures never abort a load.

use crate::contract::{ContractCapabilities, MarketplaceReader, Method};
use crate::gateway::{GatewayProbe, GatewayResolver, MirrorPolicy};
use crate::models::{ExternalListingDetails, ListingRecord, Namespace, PropertyDetails};
use alloy_primitives::{Address, U256};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Which collection to load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    /// Every listed, unsold item in both namespaces
    AllActive,
    /// Properties owned by the caller
    MineInternal,
    /// External listings created by the caller
    MineExternal,
}

impl Scope {
    fn namespaces(self) -> &'static [Namespace] {
        match self {
            Scope::AllActive => &[Namespace::Internal, Namespace::External],
            Scope::MineInternal => &[Namespace::Internal],
            Scope::MineExternal => &[Namespace::External],
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::AllActive => write!(f, "all-active"),
            Scope::MineInternal => write!(f, "mine-internal"),
            Scope::MineExternal => write!(f, "mine-external"),
        }
    }
}

/// How hard the loader tries before giving up on one item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackPolicy {
    /// Check existence first when the contract can tell, and retry a failed
    /// USD-priced read with the plain getter
    #[default]
    Resilient,
    /// One detail read per item, no existence check, no retry
    Direct,
}

/// Result of one load
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub records: Vec<ListingRecord>,
    /// Identifiers dropped because reading them failed
    pub skipped: usize,
    /// Zero identifiers discarded without a detail read
    pub invalid: usize,
}

enum Detail {
    Property(PropertyDetails),
    External(ExternalListingDetails),
}

impl Detail {
    fn exists(&self) -> bool {
        match self {
            Detail::Property(p) => p.exists,
            Detail::External(l) => l.exists,
        }
    }

    fn is_active(&self) -> bool {
        match self {
            Detail::Property(p) => p.is_listed,
            Detail::External(l) => l.is_active,
        }
    }

    fn is_sold(&self) -> bool {
        match self {
            Detail::Property(p) => p.is_sold,
            Detail::External(l) => l.is_sold,
        }
    }

    fn visible_in(&self, scope: Scope) -> bool {
        match scope {
            Scope::AllActive => self.exists() && self.is_active() && !self.is_sold(),
            Scope::MineInternal | Scope::MineExternal => self.exists(),
        }
    }
}

struct Accessors {
    exists: Method,
    preferred: Method,
    plain: Method,
}

fn accessors(namespace: Namespace) -> Accessors {
    match namespace {
        Namespace::Internal => Accessors {
            exists: Method::PropertyExists,
            preferred: Method::GetPropertyWithUsdPrice,
            plain: Method::Properties,
        },
        Namespace::External => Accessors {
            exists: Method::ExternalListingExists,
            preferred: Method::GetExternalListingWithUsdPrice,
            plain: Method::ExternalListings,
        },
    }
}

fn id_accessor(namespace: Namespace, scope: Scope) -> Method {
    match (namespace, scope) {
        (Namespace::Internal, Scope::AllActive) => Method::GetListedProperties,
        (Namespace::External, Scope::AllActive) => Method::GetActiveExternalListings,
        (Namespace::Internal, _) => Method::GetUserProperties,
        (Namespace::External, _) => Method::GetUserExternalListings,
    }
}

/// Loads one scope at a time from a contract reader
pub struct ItemLoader {
    reader: Arc<dyn MarketplaceReader>,
    resolver: GatewayResolver,
    policy: FallbackPolicy,
    probe: Option<Arc<dyn GatewayProbe>>,
}

impl ItemLoader {
    pub fn new(
        reader: Arc<dyn MarketplaceReader>,
        resolver: GatewayResolver,
        policy: FallbackPolicy,
    ) -> Self {
        Self {
            reader,
            resolver,
            policy,
            probe: None,
        }
    }

    /// Probe used to pick a live mirror when the resolver allows failover
    pub fn with_probe(mut self, probe: Arc<dyn GatewayProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn resolver(&self) -> &GatewayResolver {
        &self.resolver
    }

    fn capabilities(&self) -> &ContractCapabilities {
        self.reader.capabilities()
    }

    /// Load a scope. `caller` is required for the "mine" scopes.
    pub async fn load(&self, scope: Scope, caller: Option<Address>) -> LoadReport {
        let mut report = LoadReport::default();

        for &namespace in scope.namespaces() {
            self.load_namespace(namespace, scope, caller, &mut report).await;
        }

        info!(
            "Loaded {} {} records ({} skipped, {} invalid ids)",
            report.records.len(),
            scope,
            report.skipped,
            report.invalid
        );
        report
    }

    async fn load_namespace(
        &self,
        namespace: Namespace,
        scope: Scope,
        caller: Option<Address>,
        report: &mut LoadReport,
    ) {
        let Some(ids) = self.fetch_ids(namespace, scope, caller).await else {
            return;
        };

        debug!("{} {:?} ids for {}", ids.len(), namespace, scope);

        for id in ids {
            if id.is_zero() {
                warn!("Invalid {:?} id: {}", namespace, id);
                report.invalid += 1;
                continue;
            }

            match self.load_item(namespace, id).await {
                Ok(Some((detail, usd))) => {
                    if detail.visible_in(scope) {
                        report.records.push(self.project(id, detail, usd).await);
                    } else {
                        debug!("{:?} {} hidden from {}", namespace, id, scope);
                    }
                }
                Ok(None) => debug!("{:?} {} does not exist", namespace, id),
                Err(e) => {
                    error!("Error loading {:?} {}: {:#}", namespace, id, e);
                    report.skipped += 1;
                }
            }
        }
    }

    /// Identifier list for one namespace, `None` when it cannot be read
    async fn fetch_ids(
        &self,
        namespace: Namespace,
        scope: Scope,
        caller: Option<Address>,
    ) -> Option<Vec<U256>> {
        let method = id_accessor(namespace, scope);
        if !self.capabilities().supports(method) {
            warn!("{} method not available in contract", method.abi_name());
            return None;
        }

        let result = match (method, caller) {
            (Method::GetListedProperties, _) => self.reader.listed_property_ids().await,
            (Method::GetActiveExternalListings, _) => self.reader.active_external_listing_ids().await,
            (Method::GetUserProperties, Some(user)) => self.reader.user_property_ids(user).await,
            (Method::GetUserExternalListings, Some(user)) => {
                self.reader.user_external_listing_ids(user).await
            }
            (_, None) => {
                warn!("{} needs a connected account", method.abi_name());
                return None;
            }
            (other, _) => Err(anyhow!("{} is not an id accessor", other.abi_name())),
        };

        match result {
            Ok(ids) => Some(ids),
            Err(e) => {
                error!("Error loading {:?} ids for {}: {:#}", namespace, scope, e);
                None
            }
        }
    }

    /// Details of one item and its USD price, `None` when it does not exist
    async fn load_item(&self, namespace: Namespace, id: U256) -> Result<Option<(Detail, U256)>> {
        let methods = accessors(namespace);
        let caps = self.capabilities();

        if self.policy == FallbackPolicy::Resilient && caps.supports(methods.exists) {
            let exists = match namespace {
                Namespace::Internal => self.reader.property_exists(id).await?,
                Namespace::External => self.reader.external_listing_exists(id).await?,
            };
            if !exists {
                return Ok(None);
            }
        }

        if caps.supports(methods.preferred) {
            let preferred = match namespace {
                Namespace::Internal => self
                    .reader
                    .property_with_usd_price(id)
                    .await
                    .map(|(p, usd)| (Detail::Property(p), usd)),
                Namespace::External => self
                    .reader
                    .external_listing_with_usd_price(id)
                    .await
                    .map(|(l, usd)| (Detail::External(l), usd)),
            };

            match preferred {
                Ok(found) => return Ok(Some(found)),
                Err(e) if self.policy == FallbackPolicy::Resilient => {
                    warn!(
                        "Error getting price for {:?} {}, retrying with {}: {:#}",
                        namespace,
                        id,
                        methods.plain.abi_name(),
                        e
                    );
                }
                Err(e) => return Err(e),
            }
        }

        if !caps.supports(methods.plain) {
            return Err(anyhow!(
                "contract exposes no readable detail accessor for {:?} {}",
                namespace,
                id
            ));
        }

        let detail = match namespace {
            Namespace::Internal => Detail::Property(self.reader.property(id).await?),
            Namespace::External => Detail::External(self.reader.external_listing(id).await?),
        };
        Ok(Some((detail, U256::ZERO)))
    }

    async fn image_url(&self, uri: &str) -> String {
        match (&self.probe, self.resolver.policy()) {
            (Some(probe), MirrorPolicy::OrderedFailover) => {
                self.resolver.resolve_reachable(probe.as_ref(), Some(uri)).await
            }
            _ => self.resolver.resolve(Some(uri)),
        }
    }

    async fn project(&self, id: U256, detail: Detail, usd: U256) -> ListingRecord {
        match detail {
            Detail::Property(p) => {
                let image = self.image_url(&p.image_uri).await;
                ListingRecord::from_property(id, p, usd, image)
            }
            Detail::External(l) => {
                let image = self.image_url(&l.image_uri).await;
                ListingRecord::from_external(id, l, usd, image)
            }
        }
    }
}
