// JSON-RPC over HTTP provider using reqwest

use crate::error::CoreError;
use crate::provider::{EthereumProvider, EventHandler, ProviderResult};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::{json, Value};
use std::cell::Cell;

/// Provider backed by a node's JSON-RPC endpoint, e.g. a local dev chain with
/// unlocked accounts. Nodes do not push `accountsChanged`/`chainChanged`, so
/// listeners are accepted and never called.
pub struct HttpProvider {
    client: Client,
    endpoint: String,
    next_id: Cell<u64>,
}

impl HttpProvider {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            next_id: Cell::new(1),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait(?Send)]
impl EthereumProvider for HttpProvider {
    async fn request(&self, method: &str, params: Value) -> ProviderResult<Value> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        debug!("HTTP provider: {} (id {})", method, id);

        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self.client.post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::Rpc(format!("HTTP request failed: {}", e)))?;

        let payload: Value = response.json()
            .await
            .map_err(|e| CoreError::Rpc(format!("Failed to read response body: {}", e)))?;

        decode_response(payload)
    }

    fn on(&self, event: &str, _handler: &EventHandler) -> ProviderResult<()> {
        debug!("HTTP provider does not emit {} events", event);
        Ok(())
    }

    fn remove_listener(&self, _event: &str, _handler: &EventHandler) -> ProviderResult<()> {
        Ok(())
    }
}

/// Pull `result` out of a JSON-RPC response, mapping `error` objects
fn decode_response(payload: Value) -> ProviderResult<Value> {
    if let Some(error) = payload.get("error") {
        let code = error.get("code").and_then(Value::as_i64);
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(CoreError::from_rpc_error(code, message));
    }
    match payload.get("result") {
        Some(result) => Ok(result.clone()),
        None => Err(CoreError::Rpc(format!("Malformed JSON-RPC response: {}", payload))),
    }
}
