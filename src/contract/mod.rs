pub mod abi;
pub mod capabilities;
pub mod rpc;
pub mod traits;
pub mod types;

pub use capabilities::{supports, ContractCapabilities, Method};
pub use rpc::{RpcClient, RpcMarketplace, RpcWallet};
pub use traits::{MarketplaceReader, MarketplaceWriter};
pub use types::{ContractCall, ExternalNftParams, PropertyParams, TxReceipt};
