//! Client for the PropertyNFT marketplace contract: capability detection,
//! listing loads across both namespaces, guarded writes and an HTML view.

pub mod config;
pub mod contract;
pub mod error;
pub mod gateway;
pub mod loader;
pub mod models;
pub mod orchestrator;
pub mod price;
pub mod session;
pub mod upload;
pub mod view;

pub use config::Config;
pub use loader::{FallbackPolicy, ItemLoader, Scope};
pub use session::Session;
