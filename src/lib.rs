//! Race-deadline reminders for keirin and auto race.
//!
//! The library holds everything that does not need a browser: the schedule
//! normalizer, deadline arithmetic, the selection store and its quota, the
//! plan gate, subscription payloads and local persistence. The Yew front end
//! in `main.rs` drives these through [`state::AppState`].

use std::collections::HashMap;
use wasm_bindgen::prelude::*;

pub mod api;
pub mod cache;
pub mod config;
pub mod deadline;
pub mod error;
pub mod notification;
pub mod plan;
pub mod schedule;
pub mod selection;
pub mod settings;
pub mod state;
pub mod storage;
pub mod sync;
pub mod utils;

pub use error::{ApiError, FeedError};
pub use schedule::{Mode, Race, Venue};
pub use selection::Selection;
pub use settings::{LinkTarget, Settings};
pub use state::{AppState, Effect};

/// Tap target for a push payload's data map, exported for the service
/// worker's `notificationclick` handler.
///
/// # Arguments
/// * `data_js` - The `data` object of the delivered message
///
/// # Returns
/// The URL to open; the notifications page when nothing usable is present
#[wasm_bindgen(js_name = resolvePushUrl)]
pub fn resolve_push_url(data_js: JsValue) -> String {
    let data: HashMap<String, String> = match serde_wasm_bindgen::from_value(data_js) {
        Ok(d) => d,
        Err(e) => {
            log::debug!("Unreadable push data: {}", e);
            HashMap::new()
        }
    };
    notification::resolve_tap_url(&data)
}
