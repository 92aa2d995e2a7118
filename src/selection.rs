//! Selected races and the plan quota that bounds them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Race keys the user wants reminders for.
///
/// Stored as a JSON object `{race_key: true}`. Only enabled entries are kept;
/// on load any truthy value counts as enabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Value>", into = "BTreeMap<String, bool>")]
pub struct Selection {
    entries: BTreeMap<String, bool>,
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

impl From<BTreeMap<String, Value>> for Selection {
    fn from(stored: BTreeMap<String, Value>) -> Self {
        let entries = stored
            .into_iter()
            .filter(|(_, value)| truthy(value))
            .map(|(key, _)| (key, true))
            .collect();
        Self { entries }
    }
}

impl From<Selection> for BTreeMap<String, bool> {
    fn from(selection: Selection) -> Self {
        selection.entries
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Enabled,
    Disabled,
    /// Quota already used up; nothing changed.
    Rejected { quota: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    /// Keys that changed state, in iteration order.
    pub changed: Vec<String>,
    /// The quota ended up full while enabling.
    pub limit_reached: bool,
}

/// Alert shown when a single toggle would exceed the quota.
pub fn quota_message(quota: usize) -> String {
    format!("通知は最大 {} 件までです。", quota)
}

/// Alert shown when a bulk enable filled the quota.
pub fn bulk_limit_message(quota: usize) -> String {
    format!("上限 {}件", quota)
}

impl Selection {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, race_key: &str) -> bool {
        self.entries.contains_key(race_key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Flip membership of `race_key`, refusing to grow past `quota`.
    pub fn toggle(&mut self, race_key: &str, quota: usize) -> ToggleOutcome {
        if self.entries.remove(race_key).is_some() {
            return ToggleOutcome::Disabled;
        }
        if self.entries.len() >= quota {
            return ToggleOutcome::Rejected { quota };
        }
        self.entries.insert(race_key.to_string(), true);
        ToggleOutcome::Enabled
    }

    pub fn remove(&mut self, race_key: &str) -> bool {
        self.entries.remove(race_key).is_some()
    }

    /// Enable keys in order until the quota is exhausted. Already selected
    /// keys are skipped without consuming a slot.
    pub fn enable_all<'a, I>(&mut self, race_keys: I, quota: usize) -> BulkOutcome
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut remaining = quota.saturating_sub(self.entries.len());
        let mut changed = Vec::new();
        for key in race_keys {
            if self.entries.contains_key(key) {
                continue;
            }
            if remaining == 0 {
                break;
            }
            self.entries.insert(key.to_string(), true);
            changed.push(key.to_string());
            remaining -= 1;
        }
        BulkOutcome {
            changed,
            limit_reached: remaining == 0 && self.entries.len() >= quota,
        }
    }

    pub fn disable_all<'a, I>(&mut self, race_keys: I) -> BulkOutcome
    where
        I: IntoIterator<Item = &'a str>,
    {
        let changed = race_keys
            .into_iter()
            .filter(|key| self.entries.remove(*key).is_some())
            .map(str::to_string)
            .collect();
        BulkOutcome {
            changed,
            limit_reached: false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(n: usize) -> Selection {
        let mut s = Selection::default();
        for i in 0..n {
            s.toggle(&format!("r{i:02}"), usize::MAX);
        }
        s
    }

    #[test]
    fn toggle_flips_membership() {
        let mut s = Selection::default();
        assert_eq!(s.toggle("a", 10), ToggleOutcome::Enabled);
        assert!(s.contains("a"));
        assert_eq!(s.toggle("a", 10), ToggleOutcome::Disabled);
        assert!(s.is_empty());
    }

    #[test]
    fn full_quota_rejects_without_change() {
        let mut s = filled(10);
        let before = s.clone();
        assert_eq!(s.toggle("eleventh", 10), ToggleOutcome::Rejected { quota: 10 });
        assert_eq!(s, before);
        assert_eq!(s.len(), 10);
        assert_eq!(quota_message(10), "通知は最大 10 件までです。");
    }

    #[test]
    fn disabling_is_allowed_when_full() {
        let mut s = filled(10);
        assert_eq!(s.toggle("r03", 10), ToggleOutcome::Disabled);
        assert_eq!(s.len(), 9);
    }

    #[test]
    fn bulk_enable_fills_remaining_slots_in_order() {
        let mut s = filled(7);
        let venue = ["v1", "v2", "v3", "v4", "v5"];
        let out = s.enable_all(venue.iter().copied(), 10);
        assert_eq!(out.changed, vec!["v1", "v2", "v3"]);
        assert!(out.limit_reached);
        assert_eq!(s.len(), 10);
        assert!(!s.contains("v4"));
    }

    #[test]
    fn bulk_enable_skips_already_selected() {
        let mut s = Selection::default();
        s.toggle("v2", 10);
        let out = s.enable_all(["v1", "v2", "v3"], 3);
        assert_eq!(out.changed, vec!["v1", "v3"]);
        assert!(out.limit_reached);
    }

    #[test]
    fn bulk_enable_with_room_to_spare() {
        let mut s = Selection::default();
        let out = s.enable_all(["v1", "v2"], 10);
        assert_eq!(out.changed.len(), 2);
        assert!(!out.limit_reached);
    }

    #[test]
    fn bulk_disable_reports_removed_only() {
        let mut s = Selection::default();
        s.enable_all(["v1", "v3"], 10);
        let out = s.disable_all(["v1", "v2", "v3"]);
        assert_eq!(out.changed, vec!["v1", "v3"]);
        assert!(s.is_empty());
    }

    #[test]
    fn stored_object_drops_disabled_entries() {
        let s: Selection = serde_json::from_str(r#"{"a":true,"b":false}"#).unwrap();
        assert_eq!(s.keys().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(serde_json::to_string(&s).unwrap(), r#"{"a":true}"#);
    }

    #[test]
    fn stored_truthy_values_count_as_selected() {
        let stored = r#"{"20240601_keirin_平塚_01":true,"20240601_keirin_平塚_02":1,"x":0,"y":null,"z":""}"#;
        let s: Selection = serde_json::from_str(stored).unwrap();
        assert_eq!(
            s.keys().collect::<Vec<_>>(),
            vec!["20240601_keirin_平塚_01", "20240601_keirin_平塚_02"]
        );
        assert_eq!(
            serde_json::to_string(&s).unwrap(),
            r#"{"20240601_keirin_平塚_01":true,"20240601_keirin_平塚_02":true}"#
        );
    }
}
