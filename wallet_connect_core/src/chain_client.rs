// Chain client abstraction - read operations layered on a provider handle

use crate::error::CoreError;
use crate::models::{FeeData, NetworkInfo};
use crate::network::network_name;
use crate::provider::{methods, EthereumProvider};
use alloy_primitives::U256;
use async_trait::async_trait;
use log::debug;
use serde_json::{json, Value};
use std::rc::Rc;

/// Result type for chain queries
pub type ChainResult<T> = Result<T, CoreError>;

/// Higher-level read operations used by the session and the metadata poller
#[async_trait(?Send)]
pub trait ChainClient {
    /// Native balance of `address` in wei
    async fn get_balance(&self, address: &str) -> ChainResult<U256>;

    /// Current fee data
    async fn get_fee_data(&self) -> ChainResult<FeeData>;

    /// Current block height
    async fn get_block_number(&self) -> ChainResult<u64>;

    /// Network the provider is connected to
    async fn get_network(&self) -> ChainResult<NetworkInfo>;
}

/// [`ChainClient`] that issues plain JSON-RPC calls through an [`EthereumProvider`]
#[derive(Clone)]
pub struct ProviderChainClient {
    provider: Rc<dyn EthereumProvider>,
}

impl ProviderChainClient {
    pub fn new(provider: Rc<dyn EthereumProvider>) -> Self {
        Self { provider }
    }

    /// Provider this client sends its requests through
    pub fn provider(&self) -> &Rc<dyn EthereumProvider> {
        &self.provider
    }

    async fn quantity(&self, method: &str, params: Value) -> ChainResult<U256> {
        let value = self.provider.request(method, params).await?;
        parse_quantity(&value)
    }
}

#[async_trait(?Send)]
impl ChainClient for ProviderChainClient {
    async fn get_balance(&self, address: &str) -> ChainResult<U256> {
        debug!("Chain client: get_balance for {}", address);
        self.quantity(methods::GET_BALANCE, json!([address, "latest"])).await
    }

    async fn get_fee_data(&self) -> ChainResult<FeeData> {
        let gas_price = self.quantity(methods::GAS_PRICE, json!([])).await?;

        // Legacy chains and some wallets do not implement this method
        let max_priority_fee_per_gas = match self.quantity(methods::MAX_PRIORITY_FEE, json!([])).await {
            Ok(fee) => Some(fee),
            Err(e) => {
                debug!("eth_maxPriorityFeePerGas unavailable: {}", e);
                None
            }
        };

        Ok(FeeData {
            gas_price: Some(gas_price),
            max_priority_fee_per_gas,
        })
    }

    async fn get_block_number(&self) -> ChainResult<u64> {
        let block = self.quantity(methods::BLOCK_NUMBER, json!([])).await?;
        u64::try_from(block)
            .map_err(|e| CoreError::ParseError(format!("Block number out of range: {}", e)))
    }

    async fn get_network(&self) -> ChainResult<NetworkInfo> {
        let chain_id = self.quantity(methods::CHAIN_ID, json!([])).await?;
        let chain_id = u64::try_from(chain_id)
            .map_err(|e| CoreError::ParseError(format!("Chain id out of range: {}", e)))?;
        Ok(NetworkInfo {
            chain_id,
            name: network_name(chain_id).to_string(),
        })
    }
}

/// Decode a JSON-RPC quantity: a `0x`-prefixed hex string, or a plain number
/// as some providers return for chain ids
pub fn parse_quantity(value: &Value) -> ChainResult<U256> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
                Some("") => Ok(U256::ZERO),
                Some(hex) => U256::from_str_radix(hex, 16),
                None => U256::from_str_radix(trimmed, 10),
            };
            parsed.map_err(|e| CoreError::ParseError(format!("Invalid quantity {}: {}", s, e)))
        }
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| CoreError::ParseError(format!("Invalid quantity: {}", n))),
        other => Err(CoreError::ParseError(format!("Invalid quantity: {}", other))),
    }
}
