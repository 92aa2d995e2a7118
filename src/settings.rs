//! User settings and notification link targets.

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::{DEFAULT_TIMER1_MINUTES, DEFAULT_TIMER2_MINUTES};
use crate::schedule::Mode;

/// Where a notification tap (or a "race info" link) should lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LinkTarget {
    /// The race page URL carried in the feed itself.
    Json,
    Oddspark,
    Chariloto,
    Winticket,
    Dmm,
    Autoracejp,
}

impl LinkTarget {
    pub fn key(&self) -> &'static str {
        match self {
            LinkTarget::Json => "json",
            LinkTarget::Oddspark => "oddspark",
            LinkTarget::Chariloto => "chariloto",
            LinkTarget::Winticket => "winticket",
            LinkTarget::Dmm => "dmm",
            LinkTarget::Autoracejp => "autoracejp",
        }
    }

    /// Parse a stored key. Unknown keys behave like [`LinkTarget::Json`].
    pub fn from_key(key: &str) -> Self {
        match key {
            "oddspark" => LinkTarget::Oddspark,
            "chariloto" => LinkTarget::Chariloto,
            "winticket" => LinkTarget::Winticket,
            "dmm" => LinkTarget::Dmm,
            "autoracejp" => LinkTarget::Autoracejp,
            _ => LinkTarget::Json,
        }
    }
}

impl From<String> for LinkTarget {
    fn from(key: String) -> Self {
        LinkTarget::from_key(&key)
    }
}

impl From<LinkTarget> for String {
    fn from(target: LinkTarget) -> Self {
        target.key().to_string()
    }
}

/// Choices offered for keirin, in display order.
pub const LINK_TARGETS_KEIRIN: [(LinkTarget, &str); 5] = [
    (LinkTarget::Json, "ネット競輪（レース情報）"),
    (LinkTarget::Oddspark, "オッズパーク"),
    (LinkTarget::Chariloto, "チャリロト"),
    (LinkTarget::Winticket, "WINTICKET"),
    (LinkTarget::Dmm, "DMM競輪"),
];

/// Choices offered for auto race, in display order.
pub const LINK_TARGETS_AUTO: [(LinkTarget, &str); 5] = [
    (LinkTarget::Autoracejp, "AutoRace.JP（公式）"),
    (LinkTarget::Oddspark, "オッズパーク"),
    (LinkTarget::Chariloto, "チャリロト"),
    (LinkTarget::Winticket, "WINTICKET"),
    (LinkTarget::Json, "投票サイトへ飛ばない"),
];

pub fn link_targets_for(mode: Mode) -> &'static [(LinkTarget, &'static str)] {
    match mode {
        Mode::Keirin => &LINK_TARGETS_KEIRIN,
        Mode::Autorace => &LINK_TARGETS_AUTO,
    }
}

/// Resolve the URL a link target points to. May be empty when the target
/// defers to the feed and the feed had no URL.
pub fn link_url(target: LinkTarget, race_url: &str, mode: Mode) -> String {
    let fixed = match (mode, target) {
        (_, LinkTarget::Json) => None,
        (Mode::Autorace, LinkTarget::Autoracejp) => Some("https://autorace.jp/"),
        (Mode::Autorace, LinkTarget::Oddspark) => Some("https://www.oddspark.com/autorace/"),
        (Mode::Autorace, LinkTarget::Chariloto) => Some("https://www.chariloto.com/autorace"),
        (Mode::Autorace, LinkTarget::Winticket) => Some("https://www.winticket.jp/autorace/"),
        (Mode::Keirin, LinkTarget::Oddspark) => Some("https://www.oddspark.com/"),
        (Mode::Keirin, LinkTarget::Chariloto) => Some("https://www.chariloto.com/keirin"),
        (Mode::Keirin, LinkTarget::Winticket) => Some("https://www.winticket.jp/keirin/"),
        (Mode::Keirin, LinkTarget::Dmm) => Some("https://keirin.dmm.com/"),
        // Targets not offered for the mode defer to the feed.
        (Mode::Autorace, LinkTarget::Dmm) | (Mode::Keirin, LinkTarget::Autoracejp) => None,
    };
    fixed.map_or_else(|| race_url.to_string(), str::to_string)
}

/// URL opened by a tapped push, falling back to the in-app list.
pub fn notify_url(target: LinkTarget, race_url: &str, mode: Mode, origin: &str) -> String {
    let link = link_url(target, race_url, mode);
    if link.is_empty() {
        format!("{}/#notifications", origin)
    } else {
        link
    }
}

/// Persisted user preferences. Missing fields take their defaults so older
/// stored shapes keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    #[serde(deserialize_with = "timer1_minutes")]
    pub timer1_minutes_before: u32,
    #[serde(deserialize_with = "lenient_bool")]
    pub timer2_enabled: bool,
    #[serde(deserialize_with = "timer2_minutes")]
    pub timer2_minutes_before: u32,
    #[serde(deserialize_with = "keirin_link_target")]
    pub link_target: LinkTarget,
    #[serde(deserialize_with = "auto_link_target")]
    pub link_target_auto: LinkTarget,
    #[serde(deserialize_with = "lenient_string")]
    pub pro_code: String,
    #[serde(deserialize_with = "lenient_bool")]
    pub notifications_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timer1_minutes_before: DEFAULT_TIMER1_MINUTES,
            timer2_enabled: false,
            timer2_minutes_before: DEFAULT_TIMER2_MINUTES,
            link_target: LinkTarget::Json,
            link_target_auto: LinkTarget::Autoracejp,
            pro_code: String::new(),
            notifications_enabled: false,
        }
    }
}

impl Settings {
    pub fn link_target_for(&self, mode: Mode) -> LinkTarget {
        match mode {
            Mode::Keirin => self.link_target,
            Mode::Autorace => self.link_target_auto,
        }
    }

    pub fn set_link_target_for(&mut self, mode: Mode, target: LinkTarget) {
        match mode {
            Mode::Keirin => self.link_target = target,
            Mode::Autorace => self.link_target_auto = target,
        }
    }
}

/// Offsets were stored as select-box strings by older builds; accept both
/// numbers and numeric strings, and fall back on anything else.
fn lenient_minutes<'de, D>(deserializer: D, fallback: u32) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let parsed = match &value {
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        serde_json::Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    };
    Ok(parsed.unwrap_or(fallback))
}

fn timer1_minutes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    lenient_minutes(deserializer, DEFAULT_TIMER1_MINUTES)
}

fn timer2_minutes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    lenient_minutes(deserializer, DEFAULT_TIMER2_MINUTES)
}

// The remaining fields follow the same rule: a null or mistyped value takes
// the field default and leaves its siblings alone.

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_bool().unwrap_or_default())
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_str().map(str::to_string).unwrap_or_default())
}

fn lenient_link_target<'de, D>(deserializer: D, fallback: LinkTarget) -> Result<LinkTarget, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_str().map_or(fallback, LinkTarget::from_key))
}

fn keirin_link_target<'de, D: Deserializer<'de>>(deserializer: D) -> Result<LinkTarget, D::Error> {
    lenient_link_target(deserializer, Settings::default().link_target)
}

fn auto_link_target<'de, D: Deserializer<'de>>(deserializer: D) -> Result<LinkTarget, D::Error> {
    lenient_link_target(deserializer, Settings::default().link_target_auto)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stored_settings_merge_over_defaults() {
        let stored = json!({ "timer1MinutesBefore": "10", "linkTarget": "dmm", "timer2Enabled": true });
        let s: Settings = serde_json::from_value(stored).unwrap();
        assert_eq!(s.timer1_minutes_before, 10);
        assert_eq!(s.timer2_minutes_before, DEFAULT_TIMER2_MINUTES);
        assert_eq!(s.link_target, LinkTarget::Dmm);
        assert_eq!(s.link_target_auto, LinkTarget::Autoracejp);
        assert!(s.timer2_enabled);
    }

    #[test]
    fn garbage_offsets_and_targets_fall_back() {
        let stored = json!({ "timer1MinutesBefore": "soon", "timer2MinutesBefore": null, "linkTarget": "nope" });
        let s: Settings = serde_json::from_value(stored).unwrap();
        assert_eq!(s.timer1_minutes_before, DEFAULT_TIMER1_MINUTES);
        assert_eq!(s.timer2_minutes_before, DEFAULT_TIMER2_MINUTES);
        assert_eq!(s.link_target, LinkTarget::Json);
    }

    #[test]
    fn one_bad_field_keeps_the_others() {
        let stored = json!({
            "timer1MinutesBefore": 10,
            "linkTarget": "dmm",
            "linkTargetAuto": "winticket",
            "proCode": null
        });
        let s: Settings = serde_json::from_value(stored).unwrap();
        assert_eq!(s.timer1_minutes_before, 10);
        assert_eq!(s.link_target, LinkTarget::Dmm);
        assert_eq!(s.link_target_auto, LinkTarget::Winticket);
        assert_eq!(s.pro_code, "");
    }

    #[test]
    fn mistyped_flags_and_targets_take_field_defaults() {
        let stored = json!({
            "timer2Enabled": "yes",
            "notificationsEnabled": 1,
            "linkTarget": 3,
            "linkTargetAuto": null,
            "proCode": "ABC"
        });
        let s: Settings = serde_json::from_value(stored).unwrap();
        assert!(!s.timer2_enabled);
        assert!(!s.notifications_enabled);
        assert_eq!(s.link_target, LinkTarget::Json);
        assert_eq!(s.link_target_auto, LinkTarget::Autoracejp);
        assert_eq!(s.pro_code, "ABC");
    }

    #[test]
    fn settings_serialize_with_stored_key_names() {
        let v = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(v["timer1MinutesBefore"], 5);
        assert_eq!(v["linkTargetAuto"], "autoracejp");
        assert_eq!(v["proCode"], "");
    }

    #[test]
    fn link_urls_per_mode() {
        assert_eq!(link_url(LinkTarget::Json, "https://race/1", Mode::Keirin), "https://race/1");
        assert_eq!(link_url(LinkTarget::Dmm, "https://race/1", Mode::Keirin), "https://keirin.dmm.com/");
        assert_eq!(
            link_url(LinkTarget::Winticket, "", Mode::Autorace),
            "https://www.winticket.jp/autorace/"
        );
        assert_eq!(link_url(LinkTarget::Dmm, "https://race/9", Mode::Autorace), "https://race/9");
        assert_eq!(link_url(LinkTarget::Json, "", Mode::Autorace), "");
    }

    #[test]
    fn notify_url_falls_back_to_app() {
        assert_eq!(
            notify_url(LinkTarget::Json, "", Mode::Keirin, "https://mt.example"),
            "https://mt.example/#notifications"
        );
        assert_eq!(
            notify_url(LinkTarget::Oddspark, "", Mode::Keirin, "https://mt.example"),
            "https://www.oddspark.com/"
        );
    }
}
