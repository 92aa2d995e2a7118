//! Thread-local index of the races loaded so far.
//!
//! Selections are stored by race key only; toggling, the debounced resync
//! and the notifications page look the race details up here. Loading a
//! schedule adds its races without dropping the other mode's, so selections
//! from both modes stay resolvable for the day.
//!
//! # Cache Key Structure
//! - race key: `{YYYYMMDD}_{mode}_{venue}_{NN}`

use std::cell::RefCell;
use std::collections::HashMap;

use crate::schedule::{Race, Venue};

thread_local! {
    /// Survives component lifetimes; cleared only by a page reload.
    pub static RACE_INDEX: RefCell<HashMap<String, Race>> =
        RefCell::new(HashMap::with_capacity(256));
}

/// Add every race of `venues` to the index, replacing same-key entries.
pub fn index_venues(venues: &[Venue]) {
    RACE_INDEX.with(|index| {
        let mut index = index.borrow_mut();
        for race in venues.iter().flat_map(|v| v.races.iter()) {
            index.insert(race.race_key.clone(), race.clone());
        }
    });
}

pub fn lookup_race(race_key: &str) -> Option<Race> {
    RACE_INDEX.with(|index| index.borrow().get(race_key).cloned())
}

pub fn indexed_count() -> usize {
    RACE_INDEX.with(|index| index.borrow().len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{normalize_venues, Mode};
    use serde_json::json;

    #[test]
    fn both_modes_stay_indexed() {
        let keirin = normalize_venues(&json!([{ "venue": "平塚", "races": [{ "no": 1 }, { "no": 2 }] }]), Mode::Keirin, "20240601");
        let auto = normalize_venues(&json!([{ "venue": "川口", "races": [{ "no": 1 }] }]), Mode::Autorace, "20240601");
        index_venues(&keirin);
        index_venues(&auto);
        index_venues(&keirin);
        assert_eq!(indexed_count(), 3);
        assert_eq!(lookup_race("20240601_autorace_川口_01").map(|r| r.venue_name), Some("川口".to_string()));
        assert!(lookup_race("20240601_keirin_平塚_09").is_none());
    }
}
