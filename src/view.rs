//! HTML rendering of a session snapshot.

use crate::contract::ContractCapabilities;
use crate::models::{ListingKind, ListingRecord};
use crate::price::{format_eth, format_eth_amount, format_usd, short_address, ZeroPricePolicy};
use alloy_primitives::{Address, U256};
use maud::{html, Markup, DOCTYPE};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tab {
    #[default]
    Marketplace,
    Create,
    ListExternal,
    MyProperties,
    MyListings,
    Admin,
}

impl Tab {
    pub fn slug(self) -> &'static str {
        match self {
            Tab::Marketplace => "marketplace",
            Tab::Create => "create",
            Tab::ListExternal => "list-external",
            Tab::MyProperties => "my-properties",
            Tab::MyListings => "my-listings",
            Tab::Admin => "admin",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Tab::Marketplace => "Marketplace",
            Tab::Create => "Create Property",
            Tab::ListExternal => "List External NFT",
            Tab::MyProperties => "My Properties",
            Tab::MyListings => "My External Listings",
            Tab::Admin => "Admin Panel",
        }
    }
}

impl FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Tab::Marketplace,
            Tab::Create,
            Tab::ListExternal,
            Tab::MyProperties,
            Tab::MyListings,
            Tab::Admin,
        ]
        .into_iter()
        .find(|t| t.slug() == s)
        .ok_or_else(|| format!("unknown tab: {}", s))
    }
}

/// Everything the page needs, detached from the session
#[derive(Debug, Clone)]
pub struct ViewState {
    pub tab: Tab,
    pub account: Option<Address>,
    pub contract_address: Address,
    pub is_owner: bool,
    pub capabilities: ContractCapabilities,
    pub marketplace: Vec<ListingRecord>,
    pub my_properties: Vec<ListingRecord>,
    pub my_listings: Vec<ListingRecord>,
    pub contract_balance: U256,
    pub zero_price_policy: ZeroPricePolicy,
    pub placeholder_image: String,
    pub error: Option<String>,
    pub success: Option<String>,
}

impl ViewState {
    /// Tabs shown in the navigation bar
    pub fn visible_tabs(&self) -> Vec<Tab> {
        let mut tabs = vec![Tab::Marketplace, Tab::Create];
        if self.capabilities.can_list_external() {
            tabs.push(Tab::ListExternal);
        }
        tabs.push(Tab::MyProperties);
        if self.capabilities.can_load_user_external() {
            tabs.push(Tab::MyListings);
        }
        if self.is_owner {
            tabs.push(Tab::Admin);
        }
        tabs
    }

    /// The requested tab, or the marketplace if it is not available
    pub fn effective_tab(&self) -> Tab {
        if self.visible_tabs().contains(&self.tab) {
            self.tab
        } else {
            Tab::Marketplace
        }
    }
}

pub fn render_page(state: &ViewState) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { "PropertyNFT Marketplace" }
            }
            body {
                div class="app-container" {
                    (header(state))
                    @if let Some(error) = &state.error {
                        div class="error-message" { span { (error) } }
                    }
                    @if let Some(success) = &state.success {
                        div class="success-message" { span { (success) } }
                    }
                    @match state.account {
                        None => { (welcome()) }
                        Some(account) => {
                            (navigation(state))
                            (tab_content(state, account))
                        }
                    }
                }
            }
        }
    }
}

fn header(state: &ViewState) -> Markup {
    html! {
        header class="header" {
            div class="header-content" {
                h1 class="header-title" { "PropertyNFT Marketplace" }
                div class="header-info" {
                    div class="contract-info" {
                        "Contract: " (short_address(state.contract_address))
                        @if state.is_owner {
                            span class="owner-badge" { "OWNER" }
                        }
                    }
                    @match state.account {
                        Some(account) => {
                            div class="account-info" {
                                span { "Connected: " (short_address(account)) }
                            }
                        }
                        None => {
                            button class="connect-btn" { "Connect Wallet" }
                        }
                    }
                }
            }
        }
    }
}

fn welcome() -> Markup {
    html! {
        div class="empty-state" {
            h3 { "Welcome to PropertyNFT Marketplace" }
            p { "Connect your wallet to start buying, selling, and creating property NFTs" }
        }
    }
}

fn navigation(state: &ViewState) -> Markup {
    let active = state.effective_tab();
    html! {
        nav class="tab-navigation" {
            @for tab in state.visible_tabs() {
                a href={ "?tab=" (tab.slug()) } class=[(tab == active).then_some("active")] {
                    (tab.label())
                }
            }
        }
    }
}

fn tab_content(state: &ViewState, account: Address) -> Markup {
    match state.effective_tab() {
        Tab::Marketplace => marketplace(state, account),
        Tab::Create => create_form(),
        Tab::ListExternal => list_external_form(),
        Tab::MyProperties => my_properties(state),
        Tab::MyListings => my_listings(state),
        Tab::Admin => admin(state),
    }
}

fn empty_state(title: &str, text: &str) -> Markup {
    html! {
        div class="empty-state" {
            h3 { (title) }
            p { (text) }
        }
    }
}

fn price_block(record: &ListingRecord, policy: ZeroPricePolicy) -> Markup {
    html! {
        div class="property-price" {
            div class="price-eth" { (format_eth(&record.price_in_wei)) " ETH" }
            div class="price-usd" { (format_usd(&record.price_in_usd, policy)) }
        }
    }
}

fn card_header(record: &ListingRecord, placeholder: &str, badge: &str, badge_class: &str) -> Markup {
    html! {
        div class="property-image-container" {
            img class="property-image" src=(record.image_url) alt=(record.name)
                data-fallback=(placeholder);
            div class="property-type-badge" {
                span class={ "type-badge " (badge_class) } { (badge) }
            }
        }
    }
}

fn card_text(record: &ListingRecord) -> Markup {
    html! {
        h3 { (record.name) }
        @if !record.property_address.is_empty() {
            p class="property-address" { (record.property_address) }
        }
        @if !record.description.is_empty() {
            p class="property-description" { (record.description) }
        }
    }
}

fn id_label(record: &ListingRecord) -> String {
    match &record.kind {
        ListingKind::Internal { token_id } => format!("Token #{}", token_id),
        ListingKind::External { listing_id, .. } => format!("Listing #{}", listing_id),
    }
}

fn namespace_badge(record: &ListingRecord) -> (&'static str, &'static str) {
    if record.is_internal() {
        ("Internal NFT", "internal")
    } else {
        ("External NFT", "external")
    }
}

fn marketplace(state: &ViewState, account: Address) -> Markup {
    html! {
        div class="marketplace-section" {
            div class="section-header" { h2 { "Property Marketplace" } }
            @if state.marketplace.is_empty() {
                (empty_state("No Properties Listed", "Be the first to list a property on the marketplace!"))
            } @else {
                div class="properties-grid" {
                    @for record in &state.marketplace {
                        @let (badge, namespace) = namespace_badge(record);
                        div class="property-card" data-namespace=(namespace) data-id=(record.id()) {
                            (card_header(record, &state.placeholder_image, badge, namespace))
                            div class="property-details" {
                                (card_text(record))
                                (price_block(record, state.zero_price_policy))
                                p class="owner" { "Owner: " (short_address(record.owner)) }
                                div class="property-status" {
                                    span class="status listed" { "Listed" }
                                    span class="token-id" { (id_label(record)) }
                                }
                                @if record.is_owned_by(account) {
                                    div class="owner-badge" { "You own this property" }
                                } @else {
                                    button class="purchase-btn" data-price=(record.price_in_wei) { "Buy Now" }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn my_properties(state: &ViewState) -> Markup {
    html! {
        div class="my-properties-section" {
            div class="section-header" { h2 { "My Properties" } }
            @if state.my_properties.is_empty() {
                (empty_state("No Properties Owned", "You don't own any properties yet. Create or buy some to see them here!"))
            } @else {
                div class="properties-grid" {
                    @for record in &state.my_properties {
                        div class="property-card" data-namespace="internal" data-id=(record.id()) {
                            (card_header(record, &state.placeholder_image, "My Property", "internal"))
                            div class="property-details" {
                                (card_text(record))
                                (price_block(record, state.zero_price_policy))
                                div class="property-status" {
                                    span class={ "status " (if record.is_active { "listed" } else { "unlisted" }) } {
                                        (if record.is_sold { "Sold" } else if record.is_active { "Listed" } else { "Not Listed" })
                                    }
                                    span class="token-id" { (id_label(record)) }
                                }
                                div class="owner-badge" { "You own this property" }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn my_listings(state: &ViewState) -> Markup {
    html! {
        div class="my-properties-section" {
            div class="section-header" { h2 { "My External Listings" } }
            @if state.my_listings.is_empty() {
                (empty_state("No External Listings", "You haven't listed any external NFTs yet. List some to see them here!"))
            } @else {
                div class="properties-grid" {
                    @for record in &state.my_listings {
                        div class="property-card" data-namespace="external" data-id=(record.id()) {
                            (card_header(record, &state.placeholder_image, "External NFT", "external"))
                            div class="property-details" {
                                (card_text(record))
                                (price_block(record, state.zero_price_policy))
                                @if let Some(contract) = record.nft_contract() {
                                    p class="owner" { "Contract: " (short_address(contract)) }
                                }
                                div class="property-status" {
                                    span class={ "status " (if record.is_active { "listed" } else { "unlisted" }) } {
                                        (if record.is_sold { "Sold" } else if record.is_active { "Active" } else { "Inactive" })
                                    }
                                    span class="token-id" { (id_label(record)) }
                                }
                                div class="owner-badge" { "Your listing" }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn text_field(label: &str, name: &str, required: bool) -> Markup {
    html! {
        div class="form-group" {
            label for=(name) { (label) @if required { " *" } }
            input type="text" class="text-input" id=(name) name=(name) required[required];
        }
    }
}

fn create_form() -> Markup {
    html! {
        div class="create-section" {
            div class="section-header" { h2 { "Create Property NFT" } }
            form class="create-form" method="post" enctype="multipart/form-data" {
                (text_field("Property Name", "name", true))
                (text_field("Property Address", "property_address", true))
                (text_field("Description", "description", false))
                (text_field("Owner Details", "owner_details", false))
                (text_field("Price in ETH", "price_in_eth", true))
                div class="form-group" {
                    label for="image" { "Property Image *" }
                    input type="file" accept="image/*" class="file-input" id="image" name="image";
                }
                button class="create-btn" type="submit" { "Create Property NFT" }
            }
        }
    }
}

fn list_external_form() -> Markup {
    html! {
        div class="create-section" {
            div class="section-header" { h2 { "List External NFT" } }
            form class="create-form" method="post" enctype="multipart/form-data" {
                (text_field("NFT Contract Address", "nft_contract", true))
                (text_field("Token ID", "token_id", true))
                (text_field("NFT Name", "name", true))
                (text_field("Property Address", "property_address", false))
                (text_field("Description", "description", false))
                (text_field("Owner Details", "owner_details", false))
                (text_field("Price in ETH", "price_in_eth", true))
                div class="form-group" {
                    label for="image" { "NFT Image *" }
                    input type="file" accept="image/*" class="file-input" id="image" name="image";
                }
                button class="create-btn" type="submit" { "List External NFT" }
            }
        }
    }
}

fn admin(state: &ViewState) -> Markup {
    html! {
        div class="admin-section" {
            div class="section-header" {
                h2 { "Admin Panel" }
                span class="owner-badge" { "Contract Owner" }
            }
            div class="admin-grid" {
                div class="admin-card" {
                    h3 { "Contract Balance" }
                    div class="balance-display" {
                        span class="balance-amount" { (format_eth_amount(state.contract_balance)) " ETH" }
                        span class="balance-label" { "Available Fees" }
                    }
                    button class="admin-btn withdraw-btn"
                        disabled[state.contract_balance.is_zero() || !state.capabilities.can_withdraw_fees()] {
                        "Withdraw Fees"
                    }
                }
                div class="admin-card" {
                    h3 { "Marketplace Statistics" }
                    div class="stats-grid" {
                        div class="stat-item" {
                            span class="stat-value" { (state.marketplace.len()) }
                            span class="stat-label" { "Listed Properties" }
                        }
                        div class="stat-item" {
                            span class="stat-value" { (state.my_properties.len()) }
                            span class="stat-label" { "Your Properties" }
                        }
                        div class="stat-item" {
                            span class="stat-value" { (state.my_listings.len()) }
                            span class="stat-label" { "External Listings" }
                        }
                    }
                }
                div class="admin-card" {
                    h3 { "Contract Information" }
                    div class="contract-details" {
                        div class="detail-item" {
                            span class="detail-label" { "Contract Address:" }
                            span class="detail-value" { (state.contract_address) }
                        }
                    }
                }
            }
        }
    }
}
