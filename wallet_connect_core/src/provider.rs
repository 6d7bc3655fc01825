// Wallet provider abstraction - EIP-1193 handles from the browser or a JSON-RPC node

use crate::error::CoreError;
use crate::models::ProviderInfo;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::rc::Rc;

/// Result type for provider requests
pub type ProviderResult<T> = Result<T, CoreError>;

/// Listener attached to a provider event. Identity (pointer equality) is what
/// `remove_listener` matches on, so keep the `Rc` you registered.
pub type EventHandler = Rc<dyn Fn(Value)>;

/// Provider event names
pub mod events {
    pub const ACCOUNTS_CHANGED: &str = "accountsChanged";
    pub const CHAIN_CHANGED: &str = "chainChanged";
}

/// JSON-RPC methods used by the connection flow
pub mod methods {
    /// Prompts the user and returns the authorized addresses
    pub const REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
    /// Silent; returns already-authorized addresses or `[]`
    pub const ACCOUNTS: &str = "eth_accounts";
    pub const GET_BALANCE: &str = "eth_getBalance";
    pub const GAS_PRICE: &str = "eth_gasPrice";
    pub const MAX_PRIORITY_FEE: &str = "eth_maxPriorityFeePerGas";
    pub const BLOCK_NUMBER: &str = "eth_blockNumber";
    pub const CHAIN_ID: &str = "eth_chainId";
}

/// An EIP-1193 style wallet provider.
/// Implementations exist for:
/// - WASM: an injected JS provider object (`window.ethereum` or an EIP-6963 announcement)
/// - Native: a JSON-RPC node reached over HTTP
#[async_trait(?Send)]
pub trait EthereumProvider {
    /// Send a JSON-RPC request; `params` is the positional parameter array
    async fn request(&self, method: &str, params: Value) -> ProviderResult<Value>;

    /// Attach a listener for `event`
    fn on(&self, event: &str, handler: &EventHandler) -> ProviderResult<()>;

    /// Detach a listener previously passed to `on`
    fn remove_listener(&self, event: &str, handler: &EventHandler) -> ProviderResult<()>;
}

/// A discovered wallet: its announced info plus the provider handle
#[derive(Clone)]
pub struct ProviderDetail {
    pub info: ProviderInfo,
    pub provider: Rc<dyn EthereumProvider>,
}

impl fmt::Debug for ProviderDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDetail")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// Whether two handles point at the same provider object
pub fn same_provider(a: &Rc<dyn EthereumProvider>, b: &Rc<dyn EthereumProvider>) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Whether two listener handles are the same closure
pub fn same_handler(a: &EventHandler, b: &EventHandler) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Decode an address list as returned by `eth_accounts`, `eth_requestAccounts`
/// and the `accountsChanged` event
pub fn parse_accounts(value: &Value) -> ProviderResult<Vec<String>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| CoreError::ParseError(format!("Invalid account entry: {}", item)))
            })
            .collect(),
        other => Err(CoreError::ParseError(format!("Invalid accounts response: {}", other))),
    }
}
