//! JavaScript interop for Firebase Cloud Messaging.
//! Provides Rust bindings to the helpers defined in firebase_helpers.js.

use log::{debug, warn};
use mofu_timer::notification::{DisplayNotification, PushMessage};
use serde::Serialize;
use wasm_bindgen::prelude::*;

#[wasm_bindgen(module = "/firebase_helpers.js")]
extern "C" {
    #[wasm_bindgen(js_name = requestPushToken, catch)]
    async fn request_push_token_js() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_name = onForegroundMessage)]
    fn on_foreground_message_js(callback: &Closure<dyn FnMut(JsValue)>);

    #[wasm_bindgen(js_name = showNotification)]
    fn show_notification_js(display: JsValue) -> js_sys::Promise;
}

/// Register the service worker, ask for permission and fetch a push token.
///
/// `Ok(None)` means the user declined.
pub async fn request_push_token() -> Result<Option<String>, String> {
    let token = request_push_token_js().await.map_err(|e| format!("{:?}", e))?;
    Ok(token.as_string().filter(|t| !t.trim().is_empty()))
}

/// Show every message that arrives while the page is open. Call once.
pub fn listen_foreground_messages() {
    let callback = Closure::<dyn FnMut(JsValue)>::new(|payload: JsValue| {
        let message: PushMessage = match serde_wasm_bindgen::from_value(payload) {
            Ok(m) => m,
            Err(e) => {
                warn!("Unreadable foreground message: {}", e);
                return;
            }
        };
        show_notification(&message.to_display());
    });
    on_foreground_message_js(&callback);
    // Lives as long as the page.
    callback.forget();
}

fn show_notification(display: &DisplayNotification) {
    // Plain objects rather than JS Maps, so `data.url` is readable on tap.
    let value = match display.serialize(&serde_wasm_bindgen::Serializer::json_compatible()) {
        Ok(v) => v,
        Err(e) => {
            warn!("Could not convert notification: {}", e);
            return;
        }
    };
    debug!("Showing foreground notification {:?}", display.tag);
    let promise = show_notification_js(value);
    wasm_bindgen_futures::spawn_local(async move {
        if let Err(e) = wasm_bindgen_futures::JsFuture::from(promise).await {
            warn!("showNotification failed: {:?}", e);
        }
    });
}
