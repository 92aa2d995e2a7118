//! Push message handling and the "selected races" list.

use encoding_rs::SHIFT_JIS;
use serde::Deserialize;
use std::collections::HashMap;

use crate::config::{APP_TITLE, NOTIFICATIONS_FALLBACK_URL};
use crate::deadline::deadline_label_or_raw;
use crate::schedule::Race;
use crate::selection::Selection;

/// Data keys that may carry the tap target, in priority order.
pub const TAP_URL_KEYS: [&str; 2] = ["url", "notify_url"];

/// URL a tapped notification should open.
pub fn resolve_tap_url(data: &HashMap<String, String>) -> String {
    TAP_URL_KEYS
        .iter()
        .filter_map(|key| data.get(*key))
        .find(|url| !url.is_empty())
        .cloned()
        .unwrap_or_else(|| NOTIFICATIONS_FALLBACK_URL.to_string())
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NotificationBody {
    pub title: Option<String>,
    pub body: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FcmOptions {
    pub link: Option<String>,
}

/// A message delivered while the page is in the foreground.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PushMessage {
    pub notification: Option<NotificationBody>,
    pub data: HashMap<String, String>,
    #[serde(rename = "fcmOptions")]
    pub fcm_options: Option<FcmOptions>,
}

/// What gets handed to `showNotification`.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DisplayNotification {
    pub title: String,
    pub body: String,
    pub icon: Option<String>,
    /// Data map with `url` resolved, so the tap handler finds it.
    pub data: HashMap<String, String>,
    /// Race key; repeats for the same race replace each other.
    pub tag: Option<String>,
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|s| !s.is_empty()).cloned()
}

impl PushMessage {
    pub fn to_display(&self) -> DisplayNotification {
        let notification = self.notification.clone().unwrap_or_default();
        let title = non_empty(notification.title.as_ref())
            .or_else(|| non_empty(self.data.get("title")))
            .unwrap_or_else(|| APP_TITLE.to_string());
        let body = non_empty(notification.body.as_ref())
            .or_else(|| non_empty(self.data.get("body")))
            .unwrap_or_default();
        let icon = non_empty(notification.icon.as_ref()).or_else(|| non_empty(self.data.get("icon")));

        let url = self
            .fcm_options
            .as_ref()
            .and_then(|o| non_empty(o.link.as_ref()))
            .unwrap_or_else(|| resolve_tap_url(&self.data));
        let mut data = self.data.clone();
        data.insert("url".to_string(), url);

        DisplayNotification {
            title,
            body,
            icon,
            tag: non_empty(self.data.get("race_key")),
            data,
        }
    }
}

/// Sort key giving Japanese dictionary order for venue names: kana first,
/// then kanji by reading as laid out in JIS X 0208.
pub fn venue_sort_key(name: &str) -> Vec<u8> {
    let (bytes, _, _) = SHIFT_JIS.encode(name);
    bytes.into_owned()
}

/// Selected races known in the index, by venue name then race number.
///
/// Keys whose race was never loaded today are left out.
pub fn selected_races(selection: &Selection, lookup: impl Fn(&str) -> Option<Race>) -> Vec<Race> {
    let mut rows: Vec<Race> = selection.keys().filter_map(|key| lookup(key)).collect();
    rows.sort_by_cached_key(|r| (venue_sort_key(&r.venue_name), r.race_no));
    rows
}

/// Plain-text list for copying, one race per line.
pub fn export_text(rows: &[Race]) -> String {
    rows.iter()
        .map(|r| format!("{} {}R {}締切", r.venue_name, r.race_no, deadline_label_or_raw(&r.closed_at_hhmm)))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{normalize_venues, Mode};
    use serde_json::json;

    fn data(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn tap_url_fallback_chain() {
        assert_eq!(resolve_tap_url(&data(&[("url", "https://a"), ("notify_url", "https://b")])), "https://a");
        assert_eq!(resolve_tap_url(&data(&[("url", ""), ("notify_url", "https://b")])), "https://b");
        assert_eq!(resolve_tap_url(&data(&[])), NOTIFICATIONS_FALLBACK_URL);
    }

    #[test]
    fn foreground_message_display() {
        let msg: PushMessage = serde_json::from_value(json!({
            "notification": { "title": "平塚1R 締切5分前" },
            "data": { "race_key": "k1", "notify_url": "https://race" },
            "fcmOptions": { "link": "" }
        }))
        .unwrap();
        let shown = msg.to_display();
        assert_eq!(shown.title, "平塚1R 締切5分前");
        assert_eq!(shown.body, "");
        assert_eq!(shown.tag.as_deref(), Some("k1"));
        assert_eq!(shown.data.get("url").map(String::as_str), Some("https://race"));
    }

    #[test]
    fn empty_message_uses_app_title() {
        let shown = PushMessage::default().to_display();
        assert_eq!(shown.title, APP_TITLE);
        assert_eq!(shown.tag, None);
        assert_eq!(shown.data["url"], NOTIFICATIONS_FALLBACK_URL);
    }

    #[test]
    fn selected_rows_sorted_and_exported() {
        let venues = normalize_venues(
            &json!([
                { "venue": "平塚", "races": [{ "no": 10, "deadline": "16:00" }, { "no": 2, "deadline": "11:05" }] },
                { "venue": "伊東", "races": [{ "no": 1, "deadline": "未定" }] }
            ]),
            Mode::Keirin,
            "20240601",
        );
        let all: Vec<Race> = venues.iter().flat_map(|v| v.races.clone()).collect();
        let mut selection = Selection::default();
        for r in &all {
            selection.toggle(&r.race_key, 10);
        }
        selection.toggle("20240601_keirin_gone_01", 10);

        let rows = selected_races(&selection, |k| all.iter().find(|r| r.race_key == k).cloned());
        let names: Vec<(String, u32)> = rows.iter().map(|r| (r.venue_name.clone(), r.race_no)).collect();
        assert_eq!(
            names,
            vec![("伊東".to_string(), 1), ("平塚".to_string(), 2), ("平塚".to_string(), 10)]
        );
        assert_eq!(export_text(&rows), "伊東 1R 未定締切\n平塚 2R 11:05締切\n平塚 10R 16:00締切");
    }

    #[test]
    fn venues_sort_by_japanese_reading() {
        let mut names = vec!["平塚", "飯塚", "浜松", "川口", "伊勢崎", "山陽"];
        names.sort_by_cached_key(|n| venue_sort_key(n));
        // いせさき, さんよう, せん, はん, ひん, へい
        assert_eq!(names, vec!["伊勢崎", "山陽", "川口", "飯塚", "浜松", "平塚"]);
    }

    #[test]
    fn selected_rows_follow_reading_order() {
        let venues = normalize_venues(
            &json!([
                { "venue": "平塚", "races": [{ "no": 1 }] },
                { "venue": "飯塚", "races": [{ "no": 1 }] },
                { "venue": "浜松", "races": [{ "no": 1 }] }
            ]),
            Mode::Autorace,
            "20240601",
        );
        let all: Vec<Race> = venues.iter().flat_map(|v| v.races.clone()).collect();
        let mut selection = Selection::default();
        for r in &all {
            selection.toggle(&r.race_key, 10);
        }
        let rows = selected_races(&selection, |k| all.iter().find(|r| r.race_key == k).cloned());
        let names: Vec<&str> = rows.iter().map(|r| r.venue_name.as_str()).collect();
        assert_eq!(names, vec!["飯塚", "浜松", "平塚"]);
    }
}
