// Wallet Connect Core Library
// Platform-agnostic wallet discovery, connection and session logic

pub mod models;
pub mod error;
pub mod provider;
pub mod chain_client;
pub mod network;
pub mod registry;
pub mod storage_trait;
pub mod settings;
pub mod manager;
pub mod poller;
pub mod views;
pub mod swap;

#[cfg(feature = "native")]
pub mod native;

#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
pub mod wasm;

#[cfg(test)]
mod testing;

// Re-exports
pub use error::CoreError;
pub use models::*;
pub use settings::{InstallLink, Settings};
pub use provider::{EthereumProvider, EventHandler, ProviderDetail};
pub use chain_client::{ChainClient, ProviderChainClient};
pub use registry::ProviderRegistry;
pub use storage_trait::*;
pub use manager::{EventOutcome, SessionEvent, SessionEventKind, WalletManager};
pub use poller::{ChainMetadata, ChainMetadataPoller};
pub use swap::{SwapError, SwapForm, SwapStatus};
