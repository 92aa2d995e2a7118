//! Daily schedule feed: fetch and normalization into venues and races.
//!
//! The feed is a loosely structured JSON file per mode per day. Field names
//! are not fixed, so every logical attribute is read through an ordered
//! table of candidate keys (see [`fields`]).

use chrono::NaiveDate;
use log::{debug, warn};
use serde_json::{Map, Value};
use std::fmt;

use crate::config::{FEED_BASE, LADIES_CLASS_MARKER};
use crate::error::FeedError;
use crate::utils::{date_key, normalize_hhmm, pad2, parse_hhmm};

/// Race type served by the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Keirin,
    Autorace,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Keirin => "keirin",
            Mode::Autorace => "autorace",
        }
    }

    /// Label shown on the mode switch.
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Keirin => "競輪",
            Mode::Autorace => "オート",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Race {
    /// `{YYYYMMDD}_{mode}_{venue}_{NN}`, the stable key for selection and storage.
    pub race_key: String,
    pub venue_key: String,
    pub venue_name: String,
    pub race_no: u32,
    pub title: String,
    /// Canonical `HH:MM` when the feed value was recognised, raw text otherwise.
    pub closed_at_hhmm: String,
    pub url: String,
    pub mode: Mode,
    pub players: Vec<String>,
    pub class_category: String,
}

impl Race {
    /// Ladies' races carry the `Ｌ級` class marker.
    pub fn is_ladies(&self) -> bool {
        self.class_category.contains(LADIES_CLASS_MARKER)
    }

    /// Title sent along with push subscriptions, e.g. `平塚3R`.
    pub fn push_title(&self) -> String {
        format!("{}{}R", self.venue_name, self.race_no)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Venue {
    pub venue_key: String,
    pub venue_name: String,
    pub grade: String,
    pub races: Vec<Race>,
}

/// Result of loading one day's schedule. Failures never escape: they leave
/// `venues` empty and put a message in `error`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleLoad {
    pub venues: Vec<Venue>,
    pub error: Option<String>,
}

/// Ordered candidate keys per logical attribute.
pub mod fields {
    /// How a candidate value is judged present.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Presence {
        /// Anything but `null`.
        NonNull,
        /// Skips `null`, `false`, `0` and empty strings.
        Truthy,
    }

    #[derive(Debug, Clone, Copy)]
    pub struct Fallback {
        pub keys: &'static [&'static str],
        pub presence: Presence,
    }

    pub const WRAPPER_LIST: Fallback = Fallback {
        keys: &["venues", "data", "items"],
        presence: Presence::Truthy,
    };
    pub const VENUE_NAME: Fallback = Fallback {
        keys: &["venue", "venueName", "name"],
        presence: Presence::Truthy,
    };
    pub const GRADE: Fallback = Fallback {
        keys: &["grade"],
        presence: Presence::Truthy,
    };
    pub const RACE_NO: Fallback = Fallback {
        keys: &["race_number", "raceNo", "race_no", "race", "no"],
        presence: Presence::NonNull,
    };
    pub const CLOSING_TIME: Fallback = Fallback {
        keys: &["closed_at", "closedAt", "close_at", "closeAt", "deadline", "shimekiri"],
        presence: Presence::Truthy,
    };
    pub const URL: Fallback = Fallback {
        keys: &["url", "raceUrl"],
        presence: Presence::Truthy,
    };
    pub const TITLE: Fallback = Fallback {
        keys: &["class_category", "title", "name"],
        presence: Presence::Truthy,
    };
    pub const CLASS_CATEGORY: Fallback = Fallback {
        keys: &["class_category", "classCategory"],
        presence: Presence::Truthy,
    };

    pub const DEFAULT_VENUE_NAME: &str = "会場";
}

use fields::{Fallback, Presence};

fn is_present(value: &Value, presence: Presence) -> bool {
    match (presence, value) {
        (_, Value::Null) => false,
        (Presence::NonNull, _) => true,
        (Presence::Truthy, Value::Bool(b)) => *b,
        (Presence::Truthy, Value::String(s)) => !s.is_empty(),
        (Presence::Truthy, Value::Number(n)) => n.as_f64().map_or(false, |f| f != 0.0),
        (Presence::Truthy, _) => true,
    }
}

/// First candidate value present in `obj`, tried in table order.
pub fn lookup<'a>(obj: &'a Map<String, Value>, fallback: &Fallback) -> Option<&'a Value> {
    fallback
        .keys
        .iter()
        .filter_map(|key| obj.get(*key))
        .find(|value| is_present(value, fallback.presence))
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn lookup_text(obj: &Map<String, Value>, fallback: &Fallback) -> Option<String> {
    lookup(obj, fallback).map(value_to_text)
}

/// Positive whole race number, accepting numeric strings.
fn value_to_race_no(value: &Value) -> Option<u32> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if n.is_finite() && n >= 1.0 && n.fract() == 0.0 && n <= u32::MAX as f64 {
        Some(n as u32)
    } else {
        None
    }
}

fn value_to_players(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Object(obj) => obj.get("name").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .collect()
}

/// Build a race key from its parts.
pub fn race_key(date_key: &str, mode: Mode, venue_name: &str, race_no: u32) -> String {
    format!("{}_{}_{}_{}", date_key, mode, venue_name, pad2(race_no))
}

fn normalize_race(raw: &Value, mode: Mode, venue_name: &str, venue_key: &str, index: usize, date_key: &str) -> Race {
    let empty = Map::new();
    let obj = raw.as_object().unwrap_or(&empty);
    let fallback_no = index as u32 + 1;

    let race_no = lookup(obj, &fields::RACE_NO)
        .and_then(value_to_race_no)
        .unwrap_or(fallback_no);
    let closed_at_hhmm = normalize_hhmm(&lookup_text(obj, &fields::CLOSING_TIME).unwrap_or_default());
    let url = lookup_text(obj, &fields::URL).unwrap_or_default();
    let title = lookup_text(obj, &fields::TITLE).unwrap_or_else(|| format!("{}R", race_no));
    let class_category = lookup_text(obj, &fields::CLASS_CATEGORY).unwrap_or_default();
    let players = value_to_players(obj.get("players"));

    Race {
        race_key: race_key(date_key, mode, venue_name, race_no),
        venue_key: venue_key.to_string(),
        venue_name: venue_name.to_string(),
        race_no,
        title,
        closed_at_hhmm,
        url,
        mode,
        players,
        class_category,
    }
}

/// Reshape a raw feed payload into venues with races sorted by number.
///
/// The payload may be a bare array of venues or an object wrapping that
/// array under one of [`fields::WRAPPER_LIST`]. It is only recognised when
/// its first venue carries a `races` array; anything else yields no venues.
pub fn normalize_venues(raw: &Value, mode: Mode, date_key: &str) -> Vec<Venue> {
    let list: &[Value] = match raw {
        Value::Array(items) => items.as_slice(),
        Value::Object(obj) => match lookup(obj, &fields::WRAPPER_LIST) {
            Some(Value::Array(items)) => items,
            _ => &[],
        },
        _ => &[],
    };

    let recognised = list
        .first()
        .and_then(|v| v.get("races"))
        .map_or(false, Value::is_array);
    if !recognised {
        debug!("{} feed has no venue list, treating as empty", mode);
        return Vec::new();
    }

    let empty = Map::new();
    list.iter()
        .map(|raw_venue| {
            let obj = raw_venue.as_object().unwrap_or(&empty);
            let venue_name = lookup_text(obj, &fields::VENUE_NAME)
                .unwrap_or_else(|| fields::DEFAULT_VENUE_NAME.to_string());
            let venue_key = format!("{}_{}", mode, venue_name);
            let grade = lookup_text(obj, &fields::GRADE).unwrap_or_default();

            let mut races: Vec<Race> = obj
                .get("races")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .enumerate()
                        .map(|(i, r)| normalize_race(r, mode, &venue_name, &venue_key, i, date_key))
                        .collect()
                })
                .unwrap_or_default();
            races.sort_by_key(|r| r.race_no);

            Venue {
                venue_key,
                venue_name,
                grade,
                races,
            }
        })
        .collect()
}

/// Ladies' races across all venues, earliest closing first.
///
/// Races with an unreadable closing time sort to the front.
pub fn ladies_races(venues: &[Venue]) -> Vec<Race> {
    let mut list: Vec<Race> = venues
        .iter()
        .flat_map(|v| v.races.iter())
        .filter(|r| r.is_ladies())
        .cloned()
        .collect();
    list.sort_by_key(|r| parse_hhmm(&r.closed_at_hhmm));
    list
}

/// Public URL of the feed for `mode` on `date`.
pub fn feed_url(mode: Mode, date: NaiveDate) -> String {
    let key = date_key(date);
    match mode {
        Mode::Keirin => format!("{}/date/keirin_race_list_{}.json", FEED_BASE, key),
        Mode::Autorace => format!("{}/autorace/autorace_race_list_{}.json", FEED_BASE, key),
    }
}

/// Decode and normalize a feed body.
pub fn parse_feed(body: &str, mode: Mode, date_key: &str) -> Result<Vec<Venue>, FeedError> {
    let raw: Value = serde_json::from_str(body)?;
    Ok(normalize_venues(&raw, mode, date_key))
}

/// Fetch the raw feed body, bypassing caches with a throwaway query parameter.
pub async fn fetch_feed_body(client: &reqwest::Client, mode: Mode, date: NaiveDate, bust: i64) -> Result<String, FeedError> {
    let url = format!("{}?t={}", feed_url(mode, date), bust);
    let response = client.get(&url).send().await?;
    if !response.status().is_success() {
        return Err(FeedError::Status {
            status: response.status().as_u16(),
        });
    }
    Ok(response.text().await?)
}

/// Turn a fetch outcome into what the page shows: the venues, or no venues
/// plus the error text.
pub fn schedule_from_result(result: Result<Vec<Venue>, FeedError>, mode: Mode) -> ScheduleLoad {
    match result {
        Ok(venues) => {
            debug!("Loaded {} {} venues", venues.len(), mode);
            ScheduleLoad { venues, error: None }
        }
        Err(e) => {
            warn!("Schedule load failed for {}: {}", mode, e);
            ScheduleLoad {
                venues: Vec::new(),
                error: Some(e.to_string()),
            }
        }
    }
}

/// Fetch and normalize one day's schedule; never fails.
pub async fn load_schedule(client: &reqwest::Client, mode: Mode, date: NaiveDate, bust: i64) -> ScheduleLoad {
    let result = match fetch_feed_body(client, mode, date, bust).await {
        Ok(body) => parse_feed(&body, mode, &date_key(date)),
        Err(e) => Err(e),
    };
    schedule_from_result(result, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DAY: &str = "20240601";

    #[test]
    fn bare_array_with_alternate_keys() {
        let raw = json!([
            {
                "venue": "平塚",
                "grade": "F1",
                "races": [
                    { "race_no": 2, "deadline": "1330", "raceUrl": "https://x/2", "title": "A級" },
                    { "raceNo": "1", "closedAt": "9:05", "url": "https://x/1", "players": ["佐藤", {"name": "鈴木"}, 3] }
                ]
            }
        ]);
        let venues = normalize_venues(&raw, Mode::Keirin, DAY);
        assert_eq!(venues.len(), 1);
        let v = &venues[0];
        assert_eq!(v.venue_key, "keirin_平塚");
        assert_eq!(v.grade, "F1");
        assert_eq!(v.races[0].race_no, 1);
        assert_eq!(v.races[0].closed_at_hhmm, "09:05");
        assert_eq!(v.races[0].url, "https://x/1");
        assert_eq!(v.races[0].title, "1R");
        assert_eq!(v.races[0].players, vec!["佐藤", "鈴木"]);
        assert_eq!(v.races[0].race_key, "20240601_keirin_平塚_01");
        assert_eq!(v.races[1].race_no, 2);
        assert_eq!(v.races[1].closed_at_hhmm, "13:30");
        assert_eq!(v.races[1].title, "A級");
    }

    #[test]
    fn wrapped_payload_and_fallback_order() {
        let raw = json!({
            "data": [
                {
                    "venueName": "川口",
                    "races": [
                        { "closed_at": "", "close_at": "15:20:00", "class_category": "一般戦" },
                        { "race_number": null, "race": 12, "closeAt": 1645 }
                    ]
                }
            ]
        });
        let venues = normalize_venues(&raw, Mode::Autorace, DAY);
        let races = &venues[0].races;
        assert_eq!(races[0].race_no, 1);
        assert_eq!(races[0].closed_at_hhmm, "15:20");
        assert_eq!(races[0].title, "一般戦");
        assert_eq!(races[0].class_category, "一般戦");
        assert_eq!(races[1].race_no, 12);
        assert_eq!(races[1].closed_at_hhmm, "16:45");
        assert_eq!(races[1].race_key, "20240601_autorace_川口_12");
    }

    #[test]
    fn venues_key_wins_over_later_wrappers() {
        let raw = json!({
            "venues": [{ "name": "伊東", "races": [{ "no": 3 }] }],
            "items": [{ "name": "別府", "races": [] }]
        });
        let venues = normalize_venues(&raw, Mode::Keirin, DAY);
        assert_eq!(venues.len(), 1);
        assert_eq!(venues[0].venue_name, "伊東");
        assert_eq!(venues[0].races[0].race_no, 3);
    }

    #[test]
    fn bad_race_numbers_fall_back_to_position() {
        let raw = json!([{ "races": [{ "race_no": "x" }, { "race_no": 0 }, { "no": 2.5 }] }]);
        let venues = normalize_venues(&raw, Mode::Keirin, DAY);
        let numbers: Vec<u32> = venues[0].races.iter().map(|r| r.race_no).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(venues[0].venue_name, "会場");
    }

    #[test]
    fn unrecognised_shapes_yield_nothing() {
        assert!(normalize_venues(&json!(null), Mode::Keirin, DAY).is_empty());
        assert!(normalize_venues(&json!({ "races": [] }), Mode::Keirin, DAY).is_empty());
        assert!(normalize_venues(&json!([{ "venue": "平塚" }]), Mode::Keirin, DAY).is_empty());
        assert!(normalize_venues(&json!([]), Mode::Keirin, DAY).is_empty());
    }

    #[test]
    fn ladies_races_sorted_by_closing_time() {
        let raw = json!([
            { "venue": "松戸", "races": [
                { "no": 1, "class_category": "Ｌ級ガールズ", "deadline": "14:00" },
                { "no": 2, "class_category": "Ａ級", "deadline": "13:00" }
            ]},
            { "venue": "高知", "races": [
                { "no": 5, "class_category": "Ｌ級ガールズ", "deadline": "11:30" }
            ]}
        ]);
        let venues = normalize_venues(&raw, Mode::Keirin, DAY);
        let ladies = ladies_races(&venues);
        let keys: Vec<&str> = ladies.iter().map(|r| r.race_key.as_str()).collect();
        assert_eq!(keys, vec!["20240601_keirin_高知_05", "20240601_keirin_松戸_01"]);
    }

    #[test]
    fn feed_urls_per_mode() {
        let d = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(
            feed_url(Mode::Keirin, d),
            "https://keirinjingle.github.io/date/keirin_race_list_20240601.json"
        );
        assert_eq!(
            feed_url(Mode::Autorace, d),
            "https://keirinjingle.github.io/autorace/autorace_race_list_20240601.json"
        );
    }

    #[test]
    fn feed_body_parses_into_venues() {
        let body = r#"{"venues":[{"venue":"川口","races":[{"race_number":1,"closed_at":"10:05"}]}]}"#;
        let load = schedule_from_result(parse_feed(body, Mode::Autorace, DAY), Mode::Autorace);
        assert!(load.error.is_none());
        assert_eq!(load.venues.len(), 1);
        assert_eq!(load.venues[0].races[0].race_key, "20240601_autorace_川口_01");
    }

    #[test]
    fn malformed_feed_gives_empty_schedule_with_error() {
        let parsed = parse_feed("<html>not json</html>", Mode::Keirin, DAY);
        assert!(matches!(parsed, Err(FeedError::Decode(_))));

        let load = schedule_from_result(parsed, Mode::Keirin);
        assert!(load.venues.is_empty());
        assert!(load.error.as_deref().map_or(false, |e| e.starts_with("JSON parse failed")));
    }

    #[test]
    fn failed_status_gives_empty_schedule_with_error() {
        let load = schedule_from_result(Err(FeedError::Status { status: 404 }), Mode::Autorace);
        assert!(load.venues.is_empty());
        assert_eq!(load.error.as_deref(), Some("JSON fetch failed: 404"));
    }
}
