mod common;

use alloy_primitives::U256;
use common::*;
use property_market::contract::{ContractCapabilities, Method};
use property_market::gateway::{GatewayResolver, MirrorPolicy, DEFAULT_PLACEHOLDER};
use property_market::models::{ListingKind, Namespace};
use property_market::{FallbackPolicy, ItemLoader, Scope};
use std::sync::Arc;

fn loader(reader: &Arc<MockReader>, policy: FallbackPolicy) -> ItemLoader {
    ItemLoader::new(reader.clone(), GatewayResolver::default(), policy)
}

fn full_reader() -> Arc<MockReader> {
    Arc::new(MockReader::new(ContractCapabilities::full()))
}

#[tokio::test]
async fn test_merges_internal_before_external() {
    let reader = full_reader();
    reader.add_property(1, property("Harbor Loft", ALICE), U256::from(300_000_000_000u64));
    reader.add_property(2, property("Mill House", BOB), U256::ZERO);
    reader.add_listing(1, listing("Garden Plot", BOB), U256::ZERO);

    let report = loader(&reader, FallbackPolicy::Resilient)
        .load(Scope::AllActive, Some(ALICE))
        .await;

    let names: Vec<_> = report.records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Harbor Loft", "Mill House", "Garden Plot"]);
    assert_eq!(report.records[0].price_in_usd, "300000000000");
    assert_eq!(
        report.records[0].image_url,
        "https://gateway.pinata.cloud/ipfs/QmHarborLoft"
    );
    assert_eq!(report.skipped, 0);
}

#[tokio::test]
async fn test_same_id_in_both_namespaces_stays_distinct() {
    let reader = full_reader();
    reader.add_property(1, property("Harbor Loft", ALICE), U256::ZERO);
    reader.add_listing(1, listing("Garden Plot", BOB), U256::ZERO);

    let report = loader(&reader, FallbackPolicy::Resilient)
        .load(Scope::AllActive, None)
        .await;

    assert_eq!(report.records.len(), 2);
    assert_eq!(report.records[0].id(), report.records[1].id());
    assert_eq!(report.records[0].namespace(), Namespace::Internal);
    assert_eq!(report.records[1].namespace(), Namespace::External);
    for record in &report.records {
        let json = serde_json::to_value(record).unwrap();
        match &record.kind {
            ListingKind::Internal { .. } => {
                assert_eq!(json["isInternal"], true);
                assert!(json.get("listingId").is_none());
            }
            ListingKind::External { .. } => {
                assert_eq!(json["isInternal"], false);
                assert!(json.get("tokenId").is_none());
                assert_eq!(json["externalTokenId"], "77");
            }
        }
    }
}

#[tokio::test]
async fn test_zero_ids_never_reach_detail_reads() {
    let reader = full_reader();
    reader.list_property_id(0);
    reader.add_property(3, property("Harbor Loft", ALICE), U256::ZERO);

    let report = loader(&reader, FallbackPolicy::Resilient)
        .load(Scope::AllActive, None)
        .await;

    assert_eq!(report.invalid, 1);
    assert_eq!(report.records.len(), 1);
    assert_eq!(reader.calls("propertyExists"), 1);
    assert_eq!(reader.calls("getPropertyWithUSDPrice"), 1);
}

#[tokio::test]
async fn test_failed_usd_read_falls_back_to_plain_getter() {
    let reader = full_reader();
    reader.add_property(1, property("Harbor Loft", ALICE), U256::from(5u64));
    reader.fail("getPropertyWithUSDPrice", 1);

    let report = loader(&reader, FallbackPolicy::Resilient)
        .load(Scope::AllActive, None)
        .await;

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].price_in_usd, "0");
    assert_eq!(reader.calls("properties"), 1);
}

#[tokio::test]
async fn test_item_failing_both_reads_is_skipped() {
    let reader = full_reader();
    reader.add_property(1, property("Harbor Loft", ALICE), U256::ZERO);
    reader.add_property(2, property("Mill House", BOB), U256::ZERO);
    reader.fail("getPropertyWithUSDPrice", 1);
    reader.fail("properties", 1);

    let report = loader(&reader, FallbackPolicy::Resilient)
        .load(Scope::AllActive, None)
        .await;

    assert_eq!(report.skipped, 1);
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].name, "Mill House");
}

#[tokio::test]
async fn test_direct_policy_does_not_retry_or_precheck() {
    let reader = full_reader();
    reader.add_property(1, property("Harbor Loft", ALICE), U256::ZERO);
    reader.fail("getPropertyWithUSDPrice", 1);

    let report = loader(&reader, FallbackPolicy::Direct)
        .load(Scope::AllActive, None)
        .await;

    assert!(report.records.is_empty());
    assert_eq!(report.skipped, 1);
    assert_eq!(reader.calls("propertyExists"), 0);
    assert_eq!(reader.calls("properties"), 0);
}

#[tokio::test]
async fn test_all_active_hides_sold_and_missing_items() {
    let reader = full_reader();
    let mut sold = property("Sold Villa", BOB);
    sold.is_sold = true;
    reader.add_property(1, sold, U256::ZERO);
    reader.list_property_id(9);
    reader.add_listing(5, listing("Garden Plot", BOB), U256::ZERO);

    let report = loader(&reader, FallbackPolicy::Resilient)
        .load(Scope::AllActive, None)
        .await;

    let names: Vec<_> = report.records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Garden Plot"]);
    // id 9 is reported missing by the existence check, not skipped
    assert_eq!(report.skipped, 0);
    assert_eq!(reader.calls("getPropertyWithUSDPrice"), 1);
}

#[tokio::test]
async fn test_mine_scope_keeps_sold_and_unlisted() {
    let reader = full_reader();
    let mut unlisted = property("Cabin", ALICE);
    unlisted.is_listed = false;
    reader.add_property(1, unlisted, U256::ZERO);
    let mut sold = property("Loft", ALICE);
    sold.is_sold = true;
    reader.add_property(2, sold, U256::ZERO);
    reader.add_property(3, property("Not Mine", BOB), U256::ZERO);

    let report = loader(&reader, FallbackPolicy::Resilient)
        .load(Scope::MineInternal, Some(ALICE))
        .await;

    let names: Vec<_> = report.records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Cabin", "Loft"]);
    assert!(report.records.iter().all(|r| r.is_internal()));
}

#[tokio::test]
async fn test_unsupported_accessors_yield_empty_namespace() {
    let reader = Arc::new(MockReader::new(ContractCapabilities::with_methods([
        Method::Name,
        Method::GetListedProperties,
        Method::Properties,
    ])));
    reader.add_property(1, property("Harbor Loft", ALICE), U256::from(9u64));
    reader.add_listing(1, listing("Garden Plot", BOB), U256::ZERO);

    let report = loader(&reader, FallbackPolicy::Resilient)
        .load(Scope::AllActive, None)
        .await;

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].price_in_usd, "0");
    assert_eq!(reader.calls("getActiveExternalListings"), 0);
    assert_eq!(reader.calls("propertyExists"), 0);
    assert_eq!(reader.calls("getPropertyWithUSDPrice"), 0);

    let mine = loader(&reader, FallbackPolicy::Resilient)
        .load(Scope::MineExternal, Some(BOB))
        .await;
    assert!(mine.records.is_empty());
    assert_eq!(mine.skipped, 0);
}

#[tokio::test]
async fn test_mine_scope_without_account_is_empty() {
    let reader = full_reader();
    reader.add_property(1, property("Harbor Loft", ALICE), U256::ZERO);

    let report = loader(&reader, FallbackPolicy::Resilient)
        .load(Scope::MineInternal, None)
        .await;

    assert!(report.records.is_empty());
    assert_eq!(reader.calls("getUserProperties"), 0);
}

#[tokio::test]
async fn test_failed_external_usd_read_falls_back_to_plain_getter() {
    let reader = full_reader();
    reader.add_listing(3, listing("Garden Plot", BOB), U256::from(7u64));
    reader.fail("getExternalListingWithUSDPrice", 3);

    let report = loader(&reader, FallbackPolicy::Resilient)
        .load(Scope::AllActive, None)
        .await;

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].namespace(), Namespace::External);
    assert_eq!(report.records[0].price_in_usd, "0");
    assert_eq!(reader.calls("externalListings"), 1);
}

#[tokio::test]
async fn test_external_existence_check_drops_missing_listing() {
    let reader = full_reader();
    let mut gone = listing("Removed Plot", BOB);
    gone.exists = false;
    reader.add_listing(2, gone, U256::ZERO);
    reader.add_listing(5, listing("Garden Plot", BOB), U256::ZERO);

    let report = loader(&reader, FallbackPolicy::Resilient)
        .load(Scope::AllActive, None)
        .await;

    let names: Vec<_> = report.records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Garden Plot"]);
    assert_eq!(reader.calls("externalListingExists"), 2);
    assert_eq!(reader.calls("getExternalListingWithUSDPrice"), 1);
    assert_eq!(report.skipped, 0);
}

#[tokio::test]
async fn test_mine_external_scope_lists_callers_listings() {
    let reader = full_reader();
    let mut sold = listing("Sold Plot", ALICE);
    sold.is_sold = true;
    reader.add_listing(1, sold, U256::ZERO);
    reader.add_listing(2, listing("Garden Plot", ALICE), U256::from(100_000_000u64));
    reader.add_listing(3, listing("Bob's Plot", BOB), U256::ZERO);
    reader.add_property(1, property("Harbor Loft", ALICE), U256::ZERO);

    let report = loader(&reader, FallbackPolicy::Resilient)
        .load(Scope::MineExternal, Some(ALICE))
        .await;

    let names: Vec<_> = report.records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Sold Plot", "Garden Plot"]);
    assert!(report.records.iter().all(|r| !r.is_internal()));
    assert_eq!(report.records[1].price_in_usd, "100000000");
    assert_eq!(reader.calls("getListedProperties"), 0);
}

#[tokio::test]
async fn test_failover_picks_first_reachable_mirror() {
    let reader = full_reader();
    reader.add_property(1, property("Harbor Loft", ALICE), U256::ZERO);
    let resolver = GatewayResolver::new(
        vec!["https://a.example/ipfs/".into(), "https://b.example/ipfs/".into()],
        DEFAULT_PLACEHOLDER.to_string(),
        MirrorPolicy::OrderedFailover,
    );
    let probe = Arc::new(ScriptedProbe::new(&["https://b.example"]));

    let report = ItemLoader::new(reader.clone(), resolver, FallbackPolicy::Resilient)
        .with_probe(probe.clone())
        .load(Scope::AllActive, None)
        .await;

    assert_eq!(report.records[0].image_url, "https://b.example/ipfs/QmHarborLoft");
    assert_eq!(
        probe.probed(),
        vec![
            "https://a.example/ipfs/QmHarborLoft".to_string(),
            "https://b.example/ipfs/QmHarborLoft".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_canonical_policy_never_probes() {
    let reader = full_reader();
    reader.add_property(1, property("Harbor Loft", ALICE), U256::ZERO);
    let probe = Arc::new(ScriptedProbe::new(&[]));

    let report = loader(&reader, FallbackPolicy::Resilient)
        .with_probe(probe.clone())
        .load(Scope::AllActive, None)
        .await;

    assert_eq!(
        report.records[0].image_url,
        "https://gateway.pinata.cloud/ipfs/QmHarborLoft"
    );
    assert!(probe.probed().is_empty());
}
