use chrono::{Datelike, Local, NaiveDate, NaiveTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::TIMER_MINUTE_CHOICES;

// Compiled regexes for closing-time parsing
static HHMM_PREFIX_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([0-9]{1,2}):([0-9]{2})").unwrap());
static HHMM_DIGITS_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([0-9]{1,2})([0-9]{2})$").unwrap());
static HHMM_STRICT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([0-9]{1,2}):([0-9]{2})$").unwrap());

/// Left-pad a number to two digits.
pub fn pad2(n: u32) -> String {
    format!("{:02}", n)
}

/// Bring a closing-time string into canonical `HH:MM`.
///
/// Supported formats:
/// - `"13:05"`, `"9:05"` and anything starting with them (`"13:05:00"`)
/// - bare digits: `"1305"`, `"905"` (read as 9:05)
///
/// Anything else is returned trimmed but otherwise untouched.
///
/// # Examples
/// ```
/// use mofu_timer::utils::normalize_hhmm;
/// assert_eq!(normalize_hhmm("13:05:00"), "13:05");
/// assert_eq!(normalize_hhmm("905"), "09:05");
/// assert_eq!(normalize_hhmm("soon"), "soon");
/// ```
pub fn normalize_hhmm(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let captures = HHMM_PREFIX_REGEX
        .captures(trimmed)
        .or_else(|| HHMM_DIGITS_REGEX.captures(trimmed));

    match captures {
        Some(c) => format!("{:0>2}:{}", &c[1], &c[2]),
        None => trimmed.to_string(),
    }
}

/// Parse a strict `H:MM`/`HH:MM` string. Out-of-range values yield `None`.
pub fn parse_hhmm(input: &str) -> Option<NaiveTime> {
    let captures = HHMM_STRICT_REGEX.captures(input)?;
    let hour: u32 = captures[1].parse().ok()?;
    let minute: u32 = captures[2].parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Format a time of day as `HH:MM`.
pub fn format_hhmm(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// `YYYYMMDD`, the key used in feed file names and race keys.
pub fn date_key(date: NaiveDate) -> String {
    format!("{}{}{}", date.year(), pad2(date.month()), pad2(date.day()))
}

/// `YYYY-MM-DD`, shown in the header.
pub fn date_label(date: NaiveDate) -> String {
    format!("{}-{}-{}", date.year(), pad2(date.month()), pad2(date.day()))
}

/// `YYYY/MM/DD` for an epoch-millisecond instant in local time.
pub fn format_ymd_slash(epoch_ms: i64) -> Option<String> {
    let date = Local.timestamp_millis_opt(epoch_ms).single()?.date_naive();
    Some(format!("{}/{}/{}", date.year(), pad2(date.month()), pad2(date.day())))
}

/// Shorten a push token for display: `first8...last6` once it exceeds 18 chars.
pub fn format_token_short(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 18 {
        return token.to_string();
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 6..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Read a reminder offset picked from the settings select. Only the offered
/// [`TIMER_MINUTE_CHOICES`] are accepted.
pub fn parse_minute_choice(input: &str) -> Result<u32, String> {
    let minutes: u32 = input
        .trim()
        .parse()
        .map_err(|_| format!("Reminder offset is not a number: {:?}", input))?;
    if TIMER_MINUTE_CHOICES.contains(&minutes) {
        Ok(minutes)
    } else {
        Err(format!("Reminder offset {} is not one of the offered choices", minutes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_every_accepted_encoding() {
        assert_eq!(normalize_hhmm("13:05"), "13:05");
        assert_eq!(normalize_hhmm("9:05"), "09:05");
        assert_eq!(normalize_hhmm("13:05:00"), "13:05");
        assert_eq!(normalize_hhmm("1305"), "13:05");
        assert_eq!(normalize_hhmm("905"), "09:05");
        assert_eq!(normalize_hhmm("  0845 "), "08:45");
    }

    #[test]
    fn unrecognized_times_pass_through() {
        assert_eq!(normalize_hhmm(""), "");
        assert_eq!(normalize_hhmm("   "), "");
        assert_eq!(normalize_hhmm("未定"), "未定");
        assert_eq!(normalize_hhmm("12345"), "12345");
        assert_eq!(normalize_hhmm("1:5"), "1:5");
    }

    #[test]
    fn strict_parse_rejects_seconds_and_bad_ranges() {
        assert_eq!(parse_hhmm("13:05"), NaiveTime::from_hms_opt(13, 5, 0));
        assert_eq!(parse_hhmm("9:05"), NaiveTime::from_hms_opt(9, 5, 0));
        assert_eq!(parse_hhmm("13:05:00"), None);
        assert_eq!(parse_hhmm("1305"), None);
        assert_eq!(parse_hhmm("25:00"), None);
        assert_eq!(parse_hhmm("12:75"), None);
    }

    #[test]
    fn date_formats() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(date_key(d), "20240307");
        assert_eq!(date_label(d), "2024-03-07");
    }

    #[test]
    fn expiry_date_uses_local_calendar_day() {
        let noon_utc = chrono::Utc
            .with_ymd_and_hms(2025, 1, 15, 12, 0, 0)
            .unwrap()
            .timestamp_millis();
        let label = format_ymd_slash(noon_utc).unwrap();
        assert!(label.starts_with("2025/01/1"), "{label}");
    }

    #[test]
    fn token_shortening() {
        assert_eq!(format_token_short(""), "");
        assert_eq!(format_token_short("short-token"), "short-token");
        assert_eq!(
            format_token_short("abcdefgh-0123456789-uvwxyz"),
            "abcdefgh...uvwxyz"
        );
    }

    #[test]
    fn minute_choices_only() {
        assert_eq!(parse_minute_choice("5"), Ok(5));
        assert_eq!(parse_minute_choice(" 15 "), Ok(15));
        assert!(parse_minute_choice("").is_err());
        assert!(parse_minute_choice("-1").is_err());
        assert!(parse_minute_choice("abc").is_err());
        assert!(parse_minute_choice("6").is_err());
        assert!(parse_minute_choice("0").is_err());
    }
}
