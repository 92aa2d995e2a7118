//! Client-side key/value persistence.
//!
//! Values are JSON under fixed keys. The browser build writes to
//! `localStorage`; tests use [`MemoryStore`].

use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashMap;

use crate::config::{STORAGE_FCM_TOKEN_SENT, STORAGE_FCM_TOKEN_SENT_AT, STORAGE_USER_ID};

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
}

/// `window.localStorage`. Missing storage or quota errors are logged and
/// otherwise ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserStorage;

impl BrowserStorage {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok().flatten()
    }
}

impl KeyValueStore for BrowserStorage {
    fn get(&self, key: &str) -> Option<String> {
        Self::storage()?.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) {
        match Self::storage() {
            Some(storage) => {
                if storage.set_item(key, value).is_err() {
                    warn!("localStorage write failed for {}", key);
                }
            }
            None => warn!("localStorage unavailable, {} not saved", key),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RefCell<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values.borrow_mut().insert(key.to_string(), value.to_string());
    }
}

/// Read a JSON value, treating absence or bad JSON as `None`.
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring unreadable {}: {}", key, e);
            None
        }
    }
}

pub fn save_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(raw) => store.set(key, &raw),
        Err(e) => warn!("Could not serialize {}: {}", key, e),
    }
}

/// Return the persisted anonymous user id, creating it on first use.
pub fn ensure_anon_user_id(store: &dyn KeyValueStore, generate: impl FnOnce() -> String) -> String {
    if let Some(existing) = store.get(STORAGE_USER_ID).filter(|id| !id.is_empty()) {
        return existing;
    }
    let id = generate();
    store.set(STORAGE_USER_ID, &id);
    id
}

/// Fresh anonymous id from `crypto.randomUUID()`, or a time-and-random
/// fallback where Web Crypto is missing.
pub fn generate_anon_user_id() -> String {
    web_sys::window()
        .and_then(|w| w.crypto().ok())
        .map(|c| c.random_uuid())
        .unwrap_or_else(|| {
            let random = (js_sys::Math::random() * f64::from(u32::MAX)) as u64;
            format!("anon_{}_{:x}", js_sys::Date::now() as i64, random)
        })
}

/// Whether `token` still has to be sent to the backend.
pub fn token_needs_registration(store: &dyn KeyValueStore, token: &str) -> bool {
    let token = token.trim();
    !token.is_empty() && store.get(STORAGE_FCM_TOKEN_SENT).as_deref() != Some(token)
}

pub fn mark_token_sent(store: &dyn KeyValueStore, token: &str, now_ms: i64) {
    store.set(STORAGE_FCM_TOKEN_SENT, token.trim());
    store.set(STORAGE_FCM_TOKEN_SENT_AT, &now_ms.to_string());
}
