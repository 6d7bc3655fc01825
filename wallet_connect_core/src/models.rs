use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Balance shown while no wallet is connected
pub const DISCONNECTED_BALANCE: &str = "0";
/// Network label shown while no wallet is connected
pub const DISCONNECTED_NETWORK: &str = "Not Connected";

/// Metadata a wallet announces about itself (EIP-6963 `info`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub uuid: String,
    pub name: String,
    /// Data URI or URL usable as an `<img src>`
    pub icon: String,
    /// Reverse-DNS identifier, e.g. "io.metamask"
    pub rdns: String,
}

/// Connection lifecycle as seen by the views
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    #[default]
    NotConnected,
    Connecting,
    Connected,
}

/// The single active connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSession {
    /// Active account, EIP-55 checksummed
    pub account: String,
    /// Ether balance as a decimal string
    pub balance: String,
    /// Friendly network label, e.g. "Ethereum Mainnet"
    pub network: String,
    pub chain_id: u64,
    /// Info of the announcing wallet; `None` for the legacy injected provider
    pub provider_info: Option<ProviderInfo>,
    /// Accounts exposed by the wallet, first = active
    pub available_accounts: Vec<String>,
}

/// Network identity reported by the chain client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub chain_id: u64,
    /// Raw network name ("homestead", "sepolia", "unknown", ...)
    pub name: String,
}

/// Fee data reported by the chain client, all values in wei
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeeData {
    pub gas_price: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
}

/// Read-only snapshot consumed by the wallet panel, wallet button and swap form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletState {
    pub is_connected: bool,
    pub account: Option<String>,
    pub balance: String,
    pub network: String,
    pub is_connecting: bool,
    pub error: Option<String>,
    pub discovered_providers: Vec<ProviderInfo>,
    pub selected_provider_info: Option<ProviderInfo>,
    pub available_accounts: Vec<String>,
}

impl WalletState {
    /// Build a snapshot from the manager's internal pieces
    pub fn from_parts(
        status: ConnectionStatus,
        error: Option<String>,
        session: Option<&ConnectionSession>,
        discovered_providers: Vec<ProviderInfo>,
    ) -> Self {
        match session {
            Some(session) if status == ConnectionStatus::Connected => Self {
                is_connected: true,
                account: Some(session.account.clone()),
                balance: session.balance.clone(),
                network: session.network.clone(),
                is_connecting: false,
                error,
                discovered_providers,
                selected_provider_info: session.provider_info.clone(),
                available_accounts: session.available_accounts.clone(),
            },
            _ => Self {
                is_connected: false,
                account: None,
                balance: DISCONNECTED_BALANCE.to_string(),
                network: DISCONNECTED_NETWORK.to_string(),
                is_connecting: status == ConnectionStatus::Connecting,
                error,
                discovered_providers,
                selected_provider_info: None,
                available_accounts: Vec::new(),
            },
        }
    }
}

impl Default for WalletState {
    fn default() -> Self {
        Self::from_parts(ConnectionStatus::NotConnected, None, None, Vec::new())
    }
}
