//! Application state and the operations that mutate it.
//!
//! The UI owns one [`AppState`] and changes it only through these methods.
//! Each method applies its change locally right away and returns the
//! remote [`Effect`]s the caller should fire; effects never feed back into
//! the state, so a failed request leaves the local selection as it is.

use log::debug;
use std::collections::BTreeMap;

use crate::api::{RemoveNotification, SubscriptionSet};
use crate::config::{STORAGE_OPEN_VENUES, STORAGE_SETTINGS, STORAGE_TOGGLED};
use crate::plan::PlanState;
use crate::schedule::Race;
use crate::selection::{bulk_limit_message, quota_message, Selection, ToggleOutcome};
use crate::settings::Settings;
use crate::storage::{load_json, save_json, KeyValueStore};
use crate::sync::{removal_for, subscription_for, unsubscription_for, SyncContext};

/// Follow-up work produced by a state change.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Subscribe(SubscriptionSet),
    Unsubscribe(SubscriptionSet),
    Remove(RemoveNotification),
    /// Blocking message for the user.
    Alert(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub selection: Selection,
    pub settings: Settings,
    pub plan: PlanState,
    /// Venue accordion state, by venue key.
    pub open_venues: BTreeMap<String, bool>,
}

impl AppState {
    /// Restore persisted state; anything missing or unreadable takes its default.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        Self {
            selection: load_json(store, STORAGE_TOGGLED).unwrap_or_default(),
            settings: load_json(store, STORAGE_SETTINGS).unwrap_or_default(),
            plan: PlanState::default(),
            open_venues: load_json(store, STORAGE_OPEN_VENUES).unwrap_or_default(),
        }
    }

    /// Write selection, settings and accordion state back to the store.
    pub fn persist(&self, store: &dyn KeyValueStore) {
        save_json(store, STORAGE_TOGGLED, &self.selection);
        save_json(store, STORAGE_SETTINGS, &self.settings);
        save_json(store, STORAGE_OPEN_VENUES, &self.open_venues);
    }

    pub fn max_notifications(&self) -> usize {
        self.plan.max_notifications()
    }

    /// Second reminder is in effect: allowed by the plan and switched on.
    pub fn timer2_active(&self) -> bool {
        self.plan.timer2_gate_open() && self.settings.timer2_enabled
    }

    /// Flip one race. `race` supplies the reminder details when enabling;
    /// without it the race is still selected but nothing is sent.
    pub fn toggle_race(&mut self, race_key: &str, race: Option<&Race>, ctx: &SyncContext) -> Vec<Effect> {
        let quota = self.max_notifications();
        match self.selection.toggle(race_key, quota) {
            ToggleOutcome::Enabled => {
                debug!("Enabled {}", race_key);
                race.map(|r| Effect::Subscribe(subscription_for(r, &self.settings, self.timer2_active(), ctx)))
                    .into_iter()
                    .collect()
            }
            ToggleOutcome::Disabled => {
                debug!("Disabled {}", race_key);
                vec![Effect::Unsubscribe(unsubscription_for(race_key, ctx))]
            }
            ToggleOutcome::Rejected { quota } => vec![Effect::Alert(quota_message(quota))],
        }
    }

    /// Drop a race from the list page.
    pub fn remove_notification(&mut self, race_key: &str, ctx: &SyncContext) -> Vec<Effect> {
        self.selection.remove(race_key);
        vec![Effect::Remove(removal_for(race_key, ctx))]
    }

    /// Bulk ON/OFF over a venue or a filtered list, in list order.
    ///
    /// Enabling only fills free quota slots; the debounced resync delivers
    /// the new subscriptions. Disabling sends one switch-off per race that
    /// was selected.
    pub fn set_races(&mut self, races: &[Race], on: bool, ctx: &SyncContext) -> Vec<Effect> {
        let keys = races.iter().map(|r| r.race_key.as_str());
        if on {
            let quota = self.max_notifications();
            let outcome = self.selection.enable_all(keys, quota);
            debug!("Bulk enabled {} races", outcome.changed.len());
            if outcome.limit_reached {
                return vec![Effect::Alert(bulk_limit_message(quota))];
            }
            Vec::new()
        } else {
            self.selection
                .disable_all(keys)
                .changed
                .iter()
                .map(|key| Effect::Unsubscribe(unsubscription_for(key, ctx)))
                .collect()
        }
    }

    pub fn reset_selection(&mut self) {
        self.selection.clear();
    }

    pub fn toggle_venue_open(&mut self, venue_key: &str) {
        let open = self.open_venues.entry(venue_key.to_string()).or_insert(false);
        *open = !*open;
    }

    pub fn is_venue_open(&self, venue_key: &str) -> bool {
        self.open_venues.get(venue_key).copied().unwrap_or(false)
    }

    /// Mark a verification as in flight.
    pub fn begin_verifying(&mut self) {
        self.plan.begin_verifying();
    }

    /// Install a verification result. A free result always switches the
    /// second reminder off so no unreachable feature stays enabled.
    pub fn apply_plan(&mut self, plan: PlanState) {
        if !plan.pro && self.settings.timer2_enabled {
            debug!("Plan is free, switching second reminder off");
            self.settings.timer2_enabled = false;
        }
        self.plan = plan;
    }

    /// Switch the second reminder; ignored while the plan does not allow it.
    pub fn set_timer2_enabled(&mut self, on: bool) {
        self.settings.timer2_enabled = on && self.plan.timer2_gate_open();
    }
}
