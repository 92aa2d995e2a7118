//! Subscription payloads sent to the backend, and the fire-and-forget
//! senders that deliver them.

use futures::future::join_all;
use log::{debug, info, warn};

use crate::api::{ApiClient, DeviceRegistration, RemoveNotification, SubscriptionDetails, SubscriptionSet, TestPush};
use crate::config::TEST_PUSH_DELAY_SEC;
use crate::schedule::Race;
use crate::selection::Selection;
use crate::settings::{notify_url, Settings};
use crate::storage::{mark_token_sent, token_needs_registration, KeyValueStore};

// Test push status shown next to the button.
pub const TEST_PUSH_SENDING: &str = "送信中...";
pub const TEST_PUSH_OK: &str = "OK";
pub const TEST_PUSH_FAILED: &str = "失敗";
pub const TEST_PUSH_NO_API: &str = "API未設定";

/// Who is subscribing, and from where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncContext {
    pub anon_user_id: String,
    /// Page origin, used for the in-app fallback link.
    pub origin: String,
    /// `YYYYMMDD` of the schedule being shown.
    pub race_date: String,
}

/// Upsert for an enabled race with its reminder details.
pub fn subscription_for(race: &Race, settings: &Settings, timer2_active: bool, ctx: &SyncContext) -> SubscriptionSet {
    let target = settings.link_target_for(race.mode);
    let notify = notify_url(target, &race.url, race.mode, &ctx.origin);
    let race_url = if race.url.is_empty() { notify.clone() } else { race.url.clone() };

    SubscriptionSet {
        anon_user_id: ctx.anon_user_id.clone(),
        race_key: race.race_key.clone(),
        enabled: true,
        details: Some(SubscriptionDetails {
            race_date: ctx.race_date.clone(),
            closed_at_hhmm: race.closed_at_hhmm.clone(),
            race_url,
            link_target: target.key().to_string(),
            notify_url: notify,
            title: race.push_title(),
            timer1_min: settings.timer1_minutes_before,
            timer2_enabled: timer2_active,
            timer2_min: settings.timer2_minutes_before,
        }),
    }
}

/// Upsert that switches a race off.
pub fn unsubscription_for(race_key: &str, ctx: &SyncContext) -> SubscriptionSet {
    SubscriptionSet {
        anon_user_id: ctx.anon_user_id.clone(),
        race_key: race_key.to_string(),
        enabled: false,
        details: None,
    }
}

pub fn removal_for(race_key: &str, ctx: &SyncContext) -> RemoveNotification {
    RemoveNotification {
        anon_user_id: ctx.anon_user_id.clone(),
        race_key: race_key.to_string(),
    }
}

/// Full-state resync: one upsert per selected race that can be resolved.
pub fn resync_payloads(
    selection: &Selection,
    settings: &Settings,
    timer2_active: bool,
    ctx: &SyncContext,
    lookup: impl Fn(&str) -> Option<Race>,
) -> Vec<SubscriptionSet> {
    selection
        .keys()
        .filter_map(|key| lookup(key))
        .map(|race| subscription_for(&race, settings, timer2_active, ctx))
        .collect()
}

/// Send one upsert; failures are logged and dropped.
pub async fn push_subscription(api: &ApiClient, subscription: &SubscriptionSet) {
    if !api.is_configured() {
        return;
    }
    match api.set_subscription(subscription).await {
        Ok(()) => debug!("subscriptions/set ok for {}", subscription.race_key),
        Err(e) => warn!("[subscriptions/set] failed: {}", e),
    }
}

/// Send a batch of upserts concurrently.
pub async fn push_subscriptions(api: &ApiClient, subscriptions: Vec<SubscriptionSet>) {
    if !api.is_configured() || subscriptions.is_empty() {
        return;
    }
    debug!("Resyncing {} subscriptions", subscriptions.len());
    join_all(subscriptions.iter().map(|s| push_subscription(api, s))).await;
}

/// Tell the backend a race was deleted from the list; failures are ignored.
pub async fn push_removal(api: &ApiClient, removal: &RemoveNotification) {
    if !api.is_configured() {
        return;
    }
    if let Err(e) = api.remove_notification(removal).await {
        debug!("notifications/remove ignored failure: {}", e);
    }
}

/// Register `registration.token` unless it was already sent from this
/// browser. Returns whether a request succeeded.
pub async fn register_device_once(api: &ApiClient, store: &dyn KeyValueStore, registration: &DeviceRegistration) -> bool {
    if !api.is_configured() || !token_needs_registration(store, &registration.token) {
        return false;
    }
    match api.register_device(registration).await {
        Ok(()) => {
            info!("Registered push token");
            mark_token_sent(store, &registration.token, registration.ts);
            true
        }
        Err(e) => {
            warn!("[devices/register] failed: {}", e);
            false
        }
    }
}

/// Delayed test notification that opens the in-app list.
pub fn test_push_for(token: &str, ctx: &SyncContext) -> TestPush {
    TestPush {
        anon_user_id: ctx.anon_user_id.clone(),
        token: token.to_string(),
        delay_sec: TEST_PUSH_DELAY_SEC,
        url: format!("{}/#notifications", ctx.origin),
    }
}

/// Send a test push and return the final status text.
pub async fn send_test_push(api: &ApiClient, push: &TestPush) -> &'static str {
    if !api.is_configured() {
        return TEST_PUSH_NO_API;
    }
    match api.send_test_push(push).await {
        Ok(()) => TEST_PUSH_OK,
        Err(e) => {
            warn!("[push/test] failed: {}", e);
            TEST_PUSH_FAILED
        }
    }
}
