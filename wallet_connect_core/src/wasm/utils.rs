// WASM utility functions

use crate::error::CoreError;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;

/// Sleep for the specified number of milliseconds using the browser's setTimeout.
/// Resolves immediately when no timer is available.
pub async fn sleep_ms(milliseconds: u64) {
    let timeout = i32::try_from(milliseconds).unwrap_or(i32::MAX);
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        let scheduled = web_sys::window()
            .map(|window| {
                window
                    .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, timeout)
                    .is_ok()
            })
            .unwrap_or(false);
        if !scheduled {
            let _ = resolve.call0(&JsValue::NULL);
        }
    });
    let _ = JsFuture::from(promise).await;
}

/// Full page reload, used when the wallet switches chains
pub fn reload_page() -> Result<(), CoreError> {
    web_sys::window()
        .ok_or_else(|| CoreError::Init("No window object available".to_string()))?
        .location()
        .reload()
        .map_err(|e| CoreError::Init(format!("Failed to reload page: {:?}", e)))
}
