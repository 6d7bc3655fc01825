// Wallet Connect WASM Bindings
// Browser entry point: wallet discovery, connection, session views and the simulated swap
#![cfg(target_arch = "wasm32")]

use js_sys::Promise;
use log::info;
use std::rc::Rc;
use wallet_connect_core::Settings;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

mod session;
mod storage;

use session::Session;

// Initialize panic hook and logger for WASM
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value)
        .map_err(|e| JsValue::from_str(&format!("Failed to serialize: {}", e)))
}

/// The wallet context handed to the page. Views read JSON snapshots and
/// issue commands; they never touch provider listeners themselves.
#[wasm_bindgen]
pub struct WalletApp {
    session: Rc<Session>,
}

#[wasm_bindgen]
impl WalletApp {
    /// Build the app from a JSON settings object; missing fields take defaults
    #[wasm_bindgen(constructor)]
    pub fn new(settings_json: Option<String>) -> Result<WalletApp, JsValue> {
        let settings = Settings::from_json(settings_json.as_deref().unwrap_or_default())
            .map_err(|e| JsValue::from_str(&format!("Failed to parse settings: {}", e)))?;
        settings
            .validate()
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        Ok(Self {
            session: Rc::new(Session::new(settings)),
        })
    }

    /// Start discovery and the silent reconnect check; resolves to the view model JSON
    pub fn start(&self) -> Promise {
        let session = self.session.clone();
        future_to_promise(async move {
            session
                .start()
                .await
                .map_err(|e| JsValue::from_str(&e.to_string()))?;
            info!("Wallet app started");
            Ok(JsValue::from_str(&to_json(&session.view_model())?))
        })
    }

    /// Connect the wallet with the given uuid, or the default one when omitted.
    /// Failures show up in the view model's error, the promise never rejects.
    pub fn connect(&self, uuid: Option<String>) -> Promise {
        let session = self.session.clone();
        future_to_promise(async move {
            session.connect(uuid).await;
            Ok(JsValue::from_str(&to_json(&session.view_model())?))
        })
    }

    pub fn disconnect(&self) -> Promise {
        let session = self.session.clone();
        future_to_promise(async move {
            session.disconnect().await;
            Ok(JsValue::from_str(&to_json(&session.view_model())?))
        })
    }

    pub fn clear_error(&self) {
        self.session.clear_error();
    }

    /// Called with the view model JSON after every state change
    pub fn subscribe(&self, callback: js_sys::Function) {
        self.session.subscribe(callback);
    }

    /// Raw wallet state JSON
    pub fn get_state(&self) -> Result<String, JsValue> {
        to_json(&self.session.manager.snapshot())
    }

    /// View model JSON: state plus button label, picker flag, explorer link, install links
    pub fn get_view_model(&self) -> Result<String, JsValue> {
        to_json(&self.session.view_model())
    }

    /// Block number and gas price JSON; values stay at their last good reading
    pub fn get_chain_metadata(&self) -> Result<String, JsValue> {
        to_json(&self.session.poller.metadata())
    }

    pub fn get_settings(&self) -> Result<String, JsValue> {
        to_json(&self.session.settings)
    }

    pub fn set_swap_amount(&self, amount: &str) {
        self.session.set_swap_amount(amount);
    }

    pub fn set_swap_recipient(&self, recipient: &str) {
        self.session.set_swap_recipient(recipient);
    }

    /// Fill the amount with the full balance; returns it, or nothing while disconnected
    pub fn swap_max(&self) -> Option<String> {
        self.session.swap_max()
    }

    pub fn get_swap(&self) -> Result<String, JsValue> {
        to_json(&self.session.swap_view())
    }

    /// Run the simulated swap. Rejects with the validation message when the
    /// form is not ready.
    pub fn simulate_swap(&self) -> Promise {
        let session = self.session.clone();
        future_to_promise(async move {
            session
                .simulate_swap()
                .await
                .map_err(|e| JsValue::from_str(&e.to_string()))?;
            Ok(JsValue::from_str(&to_json(&session.swap_view())?))
        })
    }
}
