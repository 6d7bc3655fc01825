// EIP-1193 provider wrapper over an injected JS object

use crate::error::CoreError;
use crate::provider::{same_handler, EthereumProvider, EventHandler, ProviderResult};
use async_trait::async_trait;
use js_sys::{Function, Object, Promise, Reflect};
use log::debug;
use serde::Serialize;
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

struct Listener {
    event: String,
    handler: EventHandler,
    closure: Closure<dyn FnMut(JsValue)>,
}

/// A provider object as injected by a wallet extension
/// (`window.ethereum`, or the `provider` of an EIP-6963 announcement)
pub struct Eip1193Provider {
    inner: JsValue,
    listeners: RefCell<Vec<Listener>>,
}

impl Eip1193Provider {
    pub fn new(inner: JsValue) -> Self {
        Self {
            inner,
            listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn js_object(&self) -> &JsValue {
        &self.inner
    }

    fn method(&self, name: &str) -> ProviderResult<Function> {
        let method = Reflect::get(&self.inner, &JsValue::from_str(name))
            .map_err(|e| CoreError::Rpc(format!("Method {} not found: {:?}", name, e)))?;
        method
            .dyn_into::<Function>()
            .map_err(|_| CoreError::Rpc(format!("Provider has no {} function", name)))
    }
}

#[async_trait(?Send)]
impl EthereumProvider for Eip1193Provider {
    async fn request(&self, method: &str, params: Value) -> ProviderResult<Value> {
        debug!("Provider request: {}", method);

        let args = Object::new();
        let params = params
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| CoreError::ParseError(format!("Failed to encode params: {}", e)))?;
        Reflect::set(&args, &"method".into(), &JsValue::from_str(method)).map_err(js_error)?;
        Reflect::set(&args, &"params".into(), &params).map_err(js_error)?;

        let result = self.method("request")?.call1(&self.inner, &args).map_err(js_error)?;
        let result = match result.dyn_into::<Promise>() {
            Ok(promise) => JsFuture::from(promise).await.map_err(js_error)?,
            Err(value) => value,
        };

        serde_wasm_bindgen::from_value(result)
            .map_err(|e| CoreError::ParseError(format!("Failed to decode {} result: {}", method, e)))
    }

    fn on(&self, event: &str, handler: &EventHandler) -> ProviderResult<()> {
        let forward = handler.clone();
        let closure = Closure::<dyn FnMut(JsValue)>::new(move |payload: JsValue| {
            let value = serde_wasm_bindgen::from_value(payload).unwrap_or(Value::Null);
            forward(value);
        });

        self.method("on")?
            .call2(&self.inner, &JsValue::from_str(event), closure.as_ref().unchecked_ref())
            .map_err(js_error)?;

        self.listeners.borrow_mut().push(Listener {
            event: event.to_string(),
            handler: handler.clone(),
            closure,
        });
        Ok(())
    }

    fn remove_listener(&self, event: &str, handler: &EventHandler) -> ProviderResult<()> {
        let position = self
            .listeners
            .borrow()
            .iter()
            .position(|l| l.event == event && same_handler(&l.handler, handler));
        let Some(position) = position else {
            return Ok(());
        };
        let listener = self.listeners.borrow_mut().remove(position);

        self.method("removeListener")?
            .call2(
                &self.inner,
                &JsValue::from_str(event),
                listener.closure.as_ref().unchecked_ref(),
            )
            .map_err(js_error)?;
        Ok(())
    }
}

/// Map a rejected provider call (`{ code, message }`) to a [`CoreError`]
pub fn js_error(err: JsValue) -> CoreError {
    let code = Reflect::get(&err, &"code".into())
        .ok()
        .and_then(|c| c.as_f64())
        .map(|c| c as i64);
    let message = Reflect::get(&err, &"message".into())
        .ok()
        .and_then(|m| m.as_string())
        .or_else(|| err.as_string())
        .unwrap_or_else(|| format!("{:?}", err));
    CoreError::from_rpc_error(code, message)
}

/// The provider a wallet injected at `window.ethereum`, if any
pub fn legacy_injected() -> Option<Rc<dyn EthereumProvider>> {
    let window = web_sys::window()?;
    let ethereum = Reflect::get(&window, &JsValue::from_str("ethereum")).ok()?;
    if ethereum.is_undefined() || ethereum.is_null() {
        return None;
    }
    Some(Rc::new(Eip1193Provider::new(ethereum)))
}
