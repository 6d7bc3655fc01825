// EIP-6963 discovery: feed `eip6963:announceProvider` events into the registry

use super::provider::Eip1193Provider;
use crate::error::CoreError;
use crate::models::ProviderInfo;
use crate::provider::ProviderDetail;
use crate::registry::{ProviderRegistry, ANNOUNCE_EVENT, REQUEST_EVENT};
use js_sys::Reflect;
use log::{info, warn};
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CustomEvent, Event, Window};

/// Keeps the announcement listener attached; dropping it detaches the listener
pub struct ProviderDiscovery {
    window: Window,
    listener: Closure<dyn FnMut(Event)>,
}

impl ProviderDiscovery {
    /// Listen for announcements, then ask installed wallets to announce themselves
    pub fn start(registry: Rc<ProviderRegistry>) -> Result<Self, CoreError> {
        let window = web_sys::window()
            .ok_or_else(|| CoreError::Init("No window object available".to_string()))?;

        let listener = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            let Ok(event) = event.dyn_into::<CustomEvent>() else {
                return;
            };
            match detail_from_js(&event.detail()) {
                Ok(detail) => {
                    registry.announce(detail);
                }
                Err(e) => warn!("Ignoring malformed provider announcement: {}", e),
            }
        });

        window
            .add_event_listener_with_callback(ANNOUNCE_EVENT, listener.as_ref().unchecked_ref())
            .map_err(|e| CoreError::Init(format!("Failed to listen for announcements: {:?}", e)))?;

        let request = Event::new(REQUEST_EVENT)
            .map_err(|e| CoreError::Init(format!("Failed to create discovery request: {:?}", e)))?;
        window
            .dispatch_event(&request)
            .map_err(|e| CoreError::Init(format!("Failed to request providers: {:?}", e)))?;
        info!("Requested provider announcements");

        Ok(Self { window, listener })
    }
}

impl Drop for ProviderDiscovery {
    fn drop(&mut self) {
        let _ = self
            .window
            .remove_event_listener_with_callback(ANNOUNCE_EVENT, self.listener.as_ref().unchecked_ref());
    }
}

fn detail_from_js(detail: &JsValue) -> Result<ProviderDetail, CoreError> {
    let info = Reflect::get(detail, &"info".into())
        .map_err(|e| CoreError::ParseError(format!("Announcement has no info: {:?}", e)))?;
    let info: ProviderInfo = serde_wasm_bindgen::from_value(info)
        .map_err(|e| CoreError::ParseError(format!("Invalid provider info: {}", e)))?;

    let provider = Reflect::get(detail, &"provider".into())
        .map_err(|e| CoreError::ParseError(format!("Announcement has no provider: {:?}", e)))?;
    if provider.is_undefined() || provider.is_null() {
        return Err(CoreError::ParseError(format!("{} announced without a provider", info.name)));
    }

    Ok(ProviderDetail {
        info,
        provider: Rc::new(Eip1193Provider::new(provider)),
    })
}
