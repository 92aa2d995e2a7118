//! Application-level configuration constants.

pub const APP_TITLE: &str = "もふタイマー";

// Remote endpoints
pub const FEED_BASE: &str = "https://keirinjingle.github.io";
pub const NOTIFICATIONS_FALLBACK_URL: &str = "https://mt.qui2.net/#notifications";
/// Backend base, injected at build time. Unset disables every remote call.
pub const API_BASE: Option<&str> = option_env!("MOFU_API_BASE");

// UI Behavior
pub const VERIFY_DEBOUNCE_MS: u32 = 600;
pub const RESYNC_DEBOUNCE_MS: u32 = 450;
pub const NOW_REFRESH_MS: u32 = 30_000;
pub const TEST_PUSH_DELAY_SEC: u32 = 5;

// Plan quotas
pub const FREE_MAX_NOTIFICATIONS: usize = 10;
pub const PRO_MAX_NOTIFICATIONS: usize = 999;

// Default values for settings
pub const DEFAULT_TIMER1_MINUTES: u32 = 5;
pub const DEFAULT_TIMER2_MINUTES: u32 = 2;

// Offsets offered in the settings dialog
pub const TIMER_MINUTE_CHOICES: [u32; 8] = [1, 2, 3, 4, 5, 7, 10, 15];

/// Marker in `class_category` for ladies' (girls) keirin races.
pub const LADIES_CLASS_MARKER: &str = "Ｌ級";

// Local storage keys
pub const STORAGE_USER_ID: &str = "mofu_anon_user_id";
pub const STORAGE_OPEN_VENUES: &str = "mofu_open_venues_v1";
pub const STORAGE_TOGGLED: &str = "mofu_race_toggled_v1";
pub const STORAGE_SETTINGS: &str = "mofu_settings_v5";
pub const STORAGE_FCM_TOKEN: &str = "mofu_fcm_token_v1";
pub const STORAGE_FCM_TOKEN_SENT: &str = "mofu_fcm_token_sent_v1";
pub const STORAGE_FCM_TOKEN_SENT_AT: &str = "mofu_fcm_token_sent_at_v1";
