use alloy_primitives::{Address, U256};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use property_market::contract::{
    ContractCapabilities, MarketplaceReader, MarketplaceWriter, RpcClient, RpcMarketplace,
    RpcWallet,
};
use property_market::gateway::{GatewayResolver, HttpProbe, MirrorPolicy, DEFAULT_GATEWAYS};
use property_market::models::{ExternalNftForm, ImageFile, PropertyForm};
use property_market::orchestrator::Action;
use property_market::price::{format_eth, format_eth_amount, format_usd, parse_eth};
use property_market::upload::PinningClient;
use property_market::view::{render_page, Tab};
use property_market::{Config, FallbackPolicy, ItemLoader, Scope, Session};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "property-market")]
#[command(about = "Browse and trade property NFTs on the marketplace contract")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured item fallback policy
    #[arg(long, global = true, value_enum)]
    fallback: Option<FallbackArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum FallbackArg {
    Resilient,
    Direct,
}

impl From<FallbackArg> for FallbackPolicy {
    fn from(arg: FallbackArg) -> Self {
        match arg {
            FallbackArg::Resilient => FallbackPolicy::Resilient,
            FallbackArg::Direct => FallbackPolicy::Direct,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ScopeArg {
    All,
    MineInternal,
    MineExternal,
}

impl From<ScopeArg> for Scope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::All => Scope::AllActive,
            ScopeArg::MineInternal => Scope::MineInternal,
            ScopeArg::MineExternal => Scope::MineExternal,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Load listings and print them
    Load {
        #[arg(long, value_enum, default_value = "all")]
        scope: ScopeArg,
        /// Account whose items to load (defaults to the wallet's first account)
        #[arg(long)]
        account: Option<Address>,
        /// Save the records as pretty JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Connect, load everything and write the HTML view
    Render {
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value = "marketplace")]
        tab: Tab,
    },
    /// Print the methods the deployed contract supports
    Capabilities,
    /// Print the contract's fee balance
    Balance,
    /// Mint and list a new property
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        property_address: String,
        #[arg(long, default_value = "")]
        owner_details: String,
        /// Price in ETH
        #[arg(long)]
        price: String,
        #[arg(long)]
        image: PathBuf,
    },
    /// List an NFT held by another contract
    ListExternal {
        #[arg(long)]
        nft_contract: String,
        #[arg(long)]
        token_id: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        property_address: String,
        #[arg(long, default_value = "")]
        owner_details: String,
        #[arg(long)]
        price: String,
        #[arg(long)]
        image: PathBuf,
    },
    /// Buy an internal property at its listed price
    Buy {
        token_id: U256,
        /// Price in ETH as shown in the listing
        #[arg(long)]
        price: String,
    },
    /// Buy an external listing at its listed price
    BuyExternal {
        listing_id: U256,
        #[arg(long)]
        price: String,
    },
    /// Withdraw collected fees (contract owner only)
    Withdraw,
}

struct Clients {
    reader: Arc<RpcMarketplace>,
    wallet: Arc<RpcWallet>,
    pinner: Arc<PinningClient>,
    probe: Option<Arc<HttpProbe>>,
}

fn build_clients(config: &Config) -> Result<Clients> {
    let capabilities = match ContractCapabilities::from_abi_file(&config.abi_path) {
        Ok(capabilities) => capabilities,
        Err(e) => {
            warn!("Could not read ABI ({:#}); assuming the full method set", e);
            ContractCapabilities::full()
        }
    };

    let reader = RpcMarketplace::new(
        RpcClient::new(config.rpc_url.clone(), config.request_timeout())?,
        config.contract_address,
        capabilities,
    );
    let wallet = RpcWallet::new(
        RpcClient::new(config.rpc_url.clone(), config.request_timeout())?,
        config.contract_address,
        config.receipt_poll_interval(),
        config.confirmation_timeout(),
    );
    let gateway = config
        .gateways
        .first()
        .cloned()
        .unwrap_or_else(|| DEFAULT_GATEWAYS[0].to_string());
    let pinner = PinningClient::new(
        config.upload.api_url.clone(),
        config.upload.token_endpoint.clone(),
        gateway,
        config.upload_timeout(),
    )?;
    let probe = match config.mirror_policy {
        MirrorPolicy::OrderedFailover => Some(Arc::new(HttpProbe::new(config.request_timeout())?)),
        MirrorPolicy::Canonical => None,
    };

    Ok(Clients {
        reader: Arc::new(reader),
        wallet: Arc::new(wallet),
        pinner: Arc::new(pinner),
        probe,
    })
}

async fn connected_session(config: &Config) -> Result<Arc<Session>> {
    let clients = build_clients(config)?;
    let mut session = Session::new(config, clients.reader, clients.wallet, clients.pinner);
    if let Some(probe) = clients.probe {
        session = session.with_gateway_probe(probe);
    }
    let session = Arc::new(session);
    let account = session.connect().await?;
    info!("Using account {}", account);
    Ok(session)
}

async fn read_image(path: &Path) -> Result<ImageFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read image {}", path.display()))?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    let content_type = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    };
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image")
        .to_string();

    Ok(ImageFile {
        file_name,
        content_type: content_type.to_string(),
        bytes,
    })
}

async fn run_action(config: &Config, action: Action) -> Result<()> {
    let session = connected_session(config).await?;
    let completed = session.perform(action).await?;
    info!(
        "Confirmed in block {:?}: {}",
        completed.confirmation.receipt.block_number, completed.confirmation.receipt.hash
    );
    println!("{}", completed.confirmation.message);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(fallback) = cli.fallback {
        config.fallback_policy = fallback.into();
    }

    match cli.command {
        Commands::Load {
            scope,
            account,
            json,
        } => {
            let scope = Scope::from(scope);
            let clients = build_clients(&config)?;
            let caller = match (scope, account) {
                (Scope::AllActive, _) => None,
                (_, Some(account)) => Some(account),
                (_, None) => {
                    let accounts = clients
                        .wallet
                        .accounts()
                        .await
                        .context("Failed to read wallet accounts")?;
                    let account = accounts
                        .first()
                        .copied()
                        .context("No accounts found. Please unlock your wallet and try again.")?;
                    Some(account)
                }
            };

            let resolver = GatewayResolver::new(
                config.gateways.clone(),
                config.placeholder_image.clone(),
                config.mirror_policy,
            );
            let mut loader = ItemLoader::new(clients.reader, resolver, config.fallback_policy);
            if let Some(probe) = clients.probe {
                loader = loader.with_probe(probe);
            }
            let report = loader.load(scope, caller).await;

            info!(
                "Loaded {} records for {} ({} skipped, {} invalid ids)",
                report.records.len(),
                scope,
                report.skipped,
                report.invalid
            );
            for (i, record) in report.records.iter().enumerate() {
                let label = if record.is_internal() { "Token" } else { "Listing" };
                println!("{}. {} ({} #{})", i + 1, record.name, label, record.id());
                println!(
                    "   {} ETH, {}",
                    format_eth(&record.price_in_wei),
                    format_usd(&record.price_in_usd, config.zero_price_policy)
                );
                if !record.property_address.is_empty() {
                    println!("   Address: {}", record.property_address);
                }
                println!("   Owner: {}", record.owner);
                println!("   Image: {}", record.image_url);
                println!();
            }

            if let Some(path) = json {
                let json = serde_json::to_string_pretty(&report.records)?;
                tokio::fs::write(&path, json)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!("Saved {} records to {}", report.records.len(), path.display());
            }
        }
        Commands::Render { out, tab } => {
            let session = connected_session(&config).await?;
            let page = render_page(&session.view_state(tab));
            tokio::fs::write(&out, page.into_string())
                .await
                .with_context(|| format!("Failed to write {}", out.display()))?;
            info!("Wrote {} view to {}", tab.slug(), out.display());
        }
        Commands::Capabilities => {
            let clients = build_clients(&config)?;
            let capabilities = clients.reader.capabilities();
            for method in capabilities.methods() {
                println!("{}", method.abi_name());
            }
            info!(
                "USD pricing: {}, external listings: {}",
                capabilities.has_usd_pricing(),
                capabilities.has_external_listings()
            );
        }
        Commands::Balance => {
            let clients = build_clients(&config)?;
            let balance = clients.reader.contract_balance().await?;
            println!("{} ETH", format_eth_amount(balance));
        }
        Commands::Create {
            name,
            description,
            property_address,
            owner_details,
            price,
            image,
        } => {
            let image = read_image(&image).await?;
            let form = PropertyForm {
                name,
                description,
                property_address,
                owner_details,
                price_in_eth: price,
            };
            run_action(&config, Action::CreateListing { form, image: Some(image) }).await?;
        }
        Commands::ListExternal {
            nft_contract,
            token_id,
            name,
            description,
            property_address,
            owner_details,
            price,
            image,
        } => {
            let image = read_image(&image).await?;
            let form = ExternalNftForm {
                nft_contract,
                token_id,
                name,
                description,
                property_address,
                owner_details,
                price_in_eth: price,
            };
            run_action(&config, Action::ListExternal { form, image: Some(image) }).await?;
        }
        Commands::Buy { token_id, price } => {
            let price_in_wei = parse_eth(&price)?;
            run_action(&config, Action::PurchaseInternal { token_id, price_in_wei }).await?;
        }
        Commands::BuyExternal { listing_id, price } => {
            let price_in_wei = parse_eth(&price)?;
            run_action(&config, Action::PurchaseExternal { listing_id, price_in_wei }).await?;
        }
        Commands::Withdraw => run_action(&config, Action::WithdrawFees).await?,
    }

    Ok(())
}
