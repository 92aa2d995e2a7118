//! Closing-time and reminder-time arithmetic.
//!
//! Times are wall-clock times of "today" on the local clock; no timezone
//! conversion happens. Unparsable closing times produce no instant rather
//! than an error and render as a placeholder.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::utils::{format_hhmm, parse_hhmm};

pub const PLACEHOLDER: &str = "--:--";

/// Closing instant of a canonical `HH:MM` on `today`.
pub fn closing_instant(closed_at_hhmm: &str, today: NaiveDate) -> Option<NaiveDateTime> {
    parse_hhmm(closed_at_hhmm).map(|t| today.and_time(t))
}

/// Reminder instant: closing time minus `minutes_before` minutes.
pub fn reminder_instant(closed_at_hhmm: &str, minutes_before: u32, today: NaiveDate) -> Option<NaiveDateTime> {
    closing_instant(closed_at_hhmm, today).map(|t| t - Duration::minutes(i64::from(minutes_before)))
}

/// Whether the race is past its deadline at `now`.
pub fn is_closed(closed_at_hhmm: &str, now: NaiveDateTime) -> bool {
    closing_instant(closed_at_hhmm, now.date()).map_or(false, |closes| now >= closes)
}

/// Whether the reminder for the race would already have fired at `now`.
pub fn reminder_passed(closed_at_hhmm: &str, minutes_before: u32, now: NaiveDateTime) -> bool {
    reminder_instant(closed_at_hhmm, minutes_before, now.date()).map_or(false, |at| now >= at)
}

/// Reminder time as `HH:MM`, or the placeholder.
pub fn reminder_label(closed_at_hhmm: &str, minutes_before: u32, today: NaiveDate) -> String {
    reminder_instant(closed_at_hhmm, minutes_before, today)
        .map(|t| format_hhmm(t.time()))
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

/// Deadline as `HH:MM`, or the placeholder.
pub fn deadline_label(closed_at_hhmm: &str) -> String {
    parse_hhmm(closed_at_hhmm)
        .map(format_hhmm)
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

/// Like [`deadline_label`] but keeps unrecognised feed text visible.
pub fn deadline_label_or_raw(closed_at_hhmm: &str) -> String {
    match parse_hhmm(closed_at_hhmm) {
        Some(t) => format_hhmm(t),
        None if !closed_at_hhmm.is_empty() => closed_at_hhmm.to_string(),
        None => PLACEHOLDER.to_string(),
    }
}
