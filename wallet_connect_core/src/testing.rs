// Scripted provider used by the unit tests

use crate::error::CoreError;
use crate::provider::{same_handler, EthereumProvider, EventHandler, ProviderResult};
use crate::storage_trait::{StorageBackend, StorageResult};
use async_trait::async_trait;
use futures_channel::oneshot;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

enum Scripted {
    Value(Value),
    Error(Option<i64>, String),
}

/// Provider whose responses are configured per method
#[derive(Default)]
pub struct MockProvider {
    responses: RefCell<HashMap<String, Scripted>>,
    gates: RefCell<HashMap<String, oneshot::Receiver<()>>>,
    calls: RefCell<Vec<(String, Value)>>,
    listeners: RefCell<Vec<(String, EventHandler)>>,
}

impl MockProvider {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// A provider that already authorized `accounts` on chain `chain_id`
    pub fn wallet(accounts: &[&str], chain_id: u64, balance_wei: &str) -> Rc<Self> {
        let provider = Self::new();
        provider.respond("eth_requestAccounts", serde_json::json!(accounts));
        provider.respond("eth_accounts", serde_json::json!(accounts));
        provider.respond("eth_chainId", Value::String(format!("{:#x}", chain_id)));
        provider.respond("eth_getBalance", Value::String(balance_wei.to_string()));
        provider
    }

    pub fn respond(&self, method: &str, value: Value) {
        self.responses
            .borrow_mut()
            .insert(method.to_string(), Scripted::Value(value));
    }

    pub fn fail(&self, method: &str, message: &str) {
        self.reject(method, None, message);
    }

    pub fn reject(&self, method: &str, code: Option<i64>, message: &str) {
        self.responses
            .borrow_mut()
            .insert(method.to_string(), Scripted::Error(code, message.to_string()));
    }

    /// Hold the next call to `method` until the returned sender fires (or is dropped)
    pub fn gate(&self, method: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.borrow_mut().insert(method.to_string(), rx);
        tx
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls.borrow().iter().filter(|(m, _)| m == method).count()
    }

    pub fn last_params(&self, method: &str) -> Option<Value> {
        self.calls
            .borrow()
            .iter()
            .rev()
            .find(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.borrow().iter().filter(|(e, _)| e == event).count()
    }

    /// Invoke every listener registered for `event`
    pub fn emit(&self, event: &str, payload: Value) {
        let handlers: Vec<EventHandler> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(e, _)| e == event)
            .map(|(_, h)| h.clone())
            .collect();
        for handler in handlers {
            handler(payload.clone());
        }
    }
}

#[async_trait(?Send)]
impl EthereumProvider for MockProvider {
    async fn request(&self, method: &str, params: Value) -> ProviderResult<Value> {
        self.calls.borrow_mut().push((method.to_string(), params));

        let gate = self.gates.borrow_mut().remove(method);
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        match self.responses.borrow().get(method) {
            Some(Scripted::Value(value)) => Ok(value.clone()),
            Some(Scripted::Error(code, message)) => Err(CoreError::from_rpc_error(*code, message.clone())),
            None => Err(CoreError::Rpc(format!("The method {} is not supported", method))),
        }
    }

    fn on(&self, event: &str, handler: &EventHandler) -> ProviderResult<()> {
        self.listeners
            .borrow_mut()
            .push((event.to_string(), handler.clone()));
        Ok(())
    }

    fn remove_listener(&self, event: &str, handler: &EventHandler) -> ProviderResult<()> {
        self.listeners
            .borrow_mut()
            .retain(|(e, h)| !(e == event && same_handler(h, handler)));
        Ok(())
    }
}

/// Storage that refuses every write, like a full or blocked localStorage
#[derive(Debug, Default)]
pub struct FailingStorage;

#[async_trait(?Send)]
impl StorageBackend for FailingStorage {
    async fn save<T: Serialize>(&self, key: &str, _data: &T) -> StorageResult<()> {
        Err(CoreError::Storage(format!("quota exceeded writing {}", key)))
    }

    async fn load<T: DeserializeOwned>(&self, _key: &str) -> StorageResult<Option<T>> {
        Ok(None)
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        Err(CoreError::Storage(format!("cannot remove {}", key)))
    }

    async fn exists(&self, _key: &str) -> StorageResult<bool> {
        Ok(false)
    }
}
