//! HTTP client for the notification backend.
//!
//! Every endpoint is a JSON POST under `{base}/api`. Without a configured
//! base the client is inert: calls return [`ApiError::NotConfigured`] and
//! the plan gate falls back to free defaults.

use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

const VERIFY_PATH: &str = "/pro/verify";
const DEVICES_REGISTER_PATH: &str = "/devices/register";
const SUBSCRIPTIONS_SET_PATH: &str = "/subscriptions/set";
const NOTIFICATIONS_REMOVE_PATH: &str = "/notifications/remove";
const PUSH_TEST_PATH: &str = "/push/test";

/// Request payload for PRO code verification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifyRequest {
    pub anon_user_id: String,
    pub pro_code: String,
}

/// Verification response. Every field is optional and loosely typed; the
/// plan gate decides how to read each one.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VerifyResponse {
    pub plan: Option<Value>,
    pub pro: Option<Value>,
    pub max_notifications: Option<Value>,
    pub timer2_allowed: Option<Value>,
    pub ads_off: Option<Value>,
    pub expires_at: Option<Value>,
    pub period: Option<Value>,
    pub message: Option<Value>,
}

/// Request payload for push token registration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceRegistration {
    pub anon_user_id: String,
    pub token: String,
    pub platform: &'static str,
    pub ua: String,
    pub origin: String,
    pub ts: i64,
}

/// Reminder details sent with an enabled subscription.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionDetails {
    pub race_date: String,
    pub closed_at_hhmm: String,
    pub race_url: String,
    pub link_target: String,
    pub notify_url: String,
    pub title: String,
    pub timer1_min: u32,
    pub timer2_enabled: bool,
    pub timer2_min: u32,
}

/// Upsert of one race subscription. Disabling sends no details.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionSet {
    pub anon_user_id: String,
    pub race_key: String,
    pub enabled: bool,
    #[serde(flatten)]
    pub details: Option<SubscriptionDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoveNotification {
    pub anon_user_id: String,
    pub race_key: String,
}

/// Request payload for a delayed test push
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestPush {
    pub anon_user_id: String,
    pub token: String,
    pub delay_sec: u32,
    pub url: String,
}

/// Notification backend client
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base: Option<String>,
}

impl ApiClient {
    /// Create a client for `base`; blank bases leave it unconfigured.
    pub fn new(base: Option<&str>) -> Self {
        let base = base
            .map(|b| b.trim().trim_end_matches('/').to_string())
            .filter(|b| !b.is_empty());
        Self {
            client: Client::new(),
            base,
        }
    }

    /// Client for the base baked in at build time.
    pub fn from_env() -> Self {
        Self::new(crate::config::API_BASE)
    }

    pub fn is_configured(&self) -> bool {
        self.base.is_some()
    }

    /// Full URL of an endpoint, if a base is configured.
    pub fn endpoint_url(&self, path: &str) -> Option<String> {
        let base = self.base.as_ref()?;
        if path.starts_with('/') {
            Some(format!("{}/api{}", base, path))
        } else {
            Some(format!("{}/api/{}", base, path))
        }
    }

    async fn post_json<T: Serialize>(&self, endpoint: &'static str, body: &T) -> Result<reqwest::Response, ApiError> {
        let url = self.endpoint_url(endpoint).ok_or(ApiError::NotConfigured)?;
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| ApiError::Http { endpoint, source })?;

        if !response.status().is_success() {
            return Err(ApiError::Status {
                endpoint,
                status: response.status().as_u16(),
            });
        }
        debug!("POST {} -> {}", endpoint, response.status());
        Ok(response)
    }

    pub async fn verify_pro(&self, request: &VerifyRequest) -> Result<VerifyResponse, ApiError> {
        let response = self.post_json(VERIFY_PATH, request).await?;
        let body = response
            .text()
            .await
            .map_err(|source| ApiError::Http {
                endpoint: VERIFY_PATH,
                source,
            })?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode {
            endpoint: VERIFY_PATH,
            message: e.to_string(),
        })
    }

    pub async fn register_device(&self, registration: &DeviceRegistration) -> Result<(), ApiError> {
        self.post_json(DEVICES_REGISTER_PATH, registration).await.map(|_| ())
    }

    pub async fn set_subscription(&self, subscription: &SubscriptionSet) -> Result<(), ApiError> {
        self.post_json(SUBSCRIPTIONS_SET_PATH, subscription).await.map(|_| ())
    }

    pub async fn remove_notification(&self, removal: &RemoveNotification) -> Result<(), ApiError> {
        self.post_json(NOTIFICATIONS_REMOVE_PATH, removal).await.map(|_| ())
    }

    pub async fn send_test_push(&self, push: &TestPush) -> Result<(), ApiError> {
        self.post_json(PUSH_TEST_PATH, push).await.map(|_| ())
    }
}
