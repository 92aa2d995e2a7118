//! PRO plan gate: verifies an entitlement code and derives quota and
//! feature flags from the answer.

use log::{info, warn};
use serde_json::Value;

use crate::api::{ApiClient, VerifyRequest, VerifyResponse};
use crate::error::ApiError;
use crate::config::{FREE_MAX_NOTIFICATIONS, PRO_MAX_NOTIFICATIONS};
use crate::utils::format_ymd_slash;

pub const MESSAGE_NOT_CONFIGURED: &str = "無料版（API未設定）";
pub const MESSAGE_FAILED: &str = "検証失敗";
pub const MESSAGE_FREE: &str = "無料版";
pub const MESSAGE_PRO: &str = "PRO";

/// Where the gate is in its `Idle -> Verifying -> Verified` cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerifyPhase {
    #[default]
    Idle,
    Verifying,
    /// `success` is false when the backend could not be asked or answered
    /// with something unusable.
    Verified { success: bool },
}

/// Quota and feature flags for a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanFlags {
    pub max_notifications: usize,
    pub timer2_allowed: bool,
    pub ads_off: bool,
}

impl PlanFlags {
    pub fn defaults_for(pro: bool) -> Self {
        Self {
            max_notifications: if pro { PRO_MAX_NOTIFICATIONS } else { FREE_MAX_NOTIFICATIONS },
            timer2_allowed: pro,
            ads_off: pro,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanState {
    pub phase: VerifyPhase,
    pub pro: bool,
    pub flags: PlanFlags,
    pub expires_at_ms: Option<i64>,
    /// Human-readable validity, e.g. `有効期限：2025/01/15`.
    pub period: String,
    pub message: String,
}

impl Default for PlanState {
    fn default() -> Self {
        Self {
            phase: VerifyPhase::Idle,
            pro: false,
            flags: PlanFlags::defaults_for(false),
            expires_at_ms: None,
            period: String::new(),
            message: String::new(),
        }
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite())
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl PlanState {
    /// Free plan with the given status message.
    pub fn free(success: bool, message: &str) -> Self {
        Self {
            phase: VerifyPhase::Verified { success },
            message: message.to_string(),
            ..Self::default()
        }
    }

    /// Read a verification answer, filling gaps from the plan defaults.
    pub fn from_response(response: &VerifyResponse) -> Self {
        let plan = match response.plan.as_ref().filter(|v| truthy(v)) {
            Some(v) => as_text(v).unwrap_or_default(),
            None if response.pro.as_ref().map_or(false, truthy) => MESSAGE_PRO.to_string(),
            None => "FREE".to_string(),
        };
        let pro = plan.to_uppercase() == MESSAGE_PRO;
        let defaults = PlanFlags::defaults_for(pro);

        let max_notifications = response
            .max_notifications
            .as_ref()
            .and_then(as_number)
            .filter(|n| *n >= 1.0)
            .map(|n| n as usize)
            .unwrap_or(defaults.max_notifications);
        let timer2_allowed = response
            .timer2_allowed
            .as_ref()
            .and_then(Value::as_bool)
            .unwrap_or(defaults.timer2_allowed);
        let ads_off = response
            .ads_off
            .as_ref()
            .and_then(Value::as_bool)
            .unwrap_or(defaults.ads_off);

        let expires_at_ms = response
            .expires_at
            .as_ref()
            .and_then(as_number)
            .filter(|ms| *ms != 0.0)
            .map(|ms| ms as i64);
        let period = match expires_at_ms.and_then(format_ymd_slash) {
            Some(label) => format!("有効期限：{}", label),
            None => response.period.as_ref().and_then(as_text).unwrap_or_default(),
        };
        let message = response
            .message
            .as_ref()
            .filter(|v| truthy(v))
            .and_then(as_text)
            .unwrap_or_else(|| (if pro { MESSAGE_PRO } else { MESSAGE_FREE }).to_string());

        Self {
            phase: VerifyPhase::Verified { success: true },
            pro,
            flags: PlanFlags {
                max_notifications,
                timer2_allowed,
                ads_off,
            },
            expires_at_ms,
            period,
            message,
        }
    }

    /// Enter the verifying phase, keeping the current flags until an answer lands.
    pub fn begin_verifying(&mut self) {
        self.phase = VerifyPhase::Verifying;
        self.message.clear();
    }

    pub fn is_loading(&self) -> bool {
        self.phase == VerifyPhase::Verifying
    }

    pub fn max_notifications(&self) -> usize {
        self.flags.max_notifications
    }

    /// The second reminder can be switched on at all.
    pub fn timer2_gate_open(&self) -> bool {
        self.pro && self.flags.timer2_allowed
    }

    pub fn ads_off(&self) -> bool {
        self.flags.ads_off
    }
}

/// Ask the backend about `code` and turn the answer into a plan.
///
/// Never fails: a missing backend, an empty code or any request error all
/// produce a free plan with an explanatory message.
pub async fn verify_code(api: &ApiClient, anon_user_id: &str, code: &str) -> PlanState {
    if !api.is_configured() {
        return PlanState::free(false, MESSAGE_NOT_CONFIGURED);
    }
    let trimmed = code.trim();
    if trimmed.is_empty() {
        return PlanState::free(true, "");
    }

    let request = VerifyRequest {
        anon_user_id: anon_user_id.to_string(),
        pro_code: trimmed.to_string(),
    };
    plan_from_result(api.verify_pro(&request).await)
}

/// Map a verification outcome to a plan. Any request error means free
/// defaults with [`MESSAGE_FAILED`].
pub fn plan_from_result(result: Result<VerifyResponse, ApiError>) -> PlanState {
    match result {
        Ok(response) => {
            let state = PlanState::from_response(&response);
            info!("PRO verification finished: pro={} quota={}", state.pro, state.max_notifications());
            state
        }
        Err(e) => {
            warn!("PRO verification failed: {}", e);
            PlanState::free(false, MESSAGE_FAILED)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn read(v: Value) -> PlanState {
        PlanState::from_response(&serde_json::from_value(v).unwrap())
    }

    #[test]
    fn defaults_follow_entitlement() {
        assert_eq!(PlanFlags::defaults_for(false).max_notifications, 10);
        let pro = PlanFlags::defaults_for(true);
        assert_eq!(pro.max_notifications, 999);
        assert!(pro.timer2_allowed && pro.ads_off);
    }

    #[test]
    fn plain_pro_answer_uses_pro_defaults() {
        let s = read(json!({ "plan": "pro" }));
        assert!(s.pro);
        assert_eq!(s.max_notifications(), 999);
        assert!(s.timer2_gate_open());
        assert!(s.ads_off());
        assert_eq!(s.message, "PRO");
        assert_eq!(s.phase, VerifyPhase::Verified { success: true });
    }

    #[test]
    fn explicit_flags_override_defaults() {
        let s = read(json!({ "pro": true, "max_notifications": "50", "timer2_allowed": false, "message": "ok" }));
        assert!(s.pro);
        assert_eq!(s.max_notifications(), 50);
        assert!(!s.timer2_gate_open());
        assert!(s.ads_off());
        assert_eq!(s.message, "ok");
    }

    #[test]
    fn free_answer_and_bad_quota() {
        let s = read(json!({ "plan": "FREE", "max_notifications": 0, "ads_off": "yes" }));
        assert!(!s.pro);
        assert_eq!(s.max_notifications(), 10);
        assert!(!s.ads_off());
        assert_eq!(s.message, "無料版");
    }

    #[test]
    fn expiry_becomes_period_label() {
        let ms = chrono::Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap().timestamp_millis();
        let s = read(json!({ "plan": "PRO", "expires_at": ms, "period": "ignored" }));
        assert_eq!(s.expires_at_ms, Some(ms));
        assert!(s.period.starts_with("有効期限：2025/01/1"), "{}", s.period);

        let s = read(json!({ "plan": "PRO", "period": "月額" }));
        assert_eq!(s.expires_at_ms, None);
        assert_eq!(s.period, "月額");
    }

    #[test]
    fn verifying_keeps_flags_until_answer() {
        let mut s = read(json!({ "plan": "PRO" }));
        s.begin_verifying();
        assert!(s.is_loading());
        assert_eq!(s.max_notifications(), 999);
        assert!(s.message.is_empty());
    }

    #[test]
    fn unconfigured_backend_is_free() {
        let api = ApiClient::new(None);
        let s = futures::executor::block_on(verify_code(&api, "u1", "CODE"));
        assert!(!s.pro);
        assert_eq!(s.message, MESSAGE_NOT_CONFIGURED);
        assert_eq!(s.max_notifications(), 10);
    }

    #[test]
    fn empty_code_is_free_without_a_request() {
        let api = ApiClient::new(Some("http://127.0.0.1:9"));
        let s = futures::executor::block_on(verify_code(&api, "u1", "   "));
        assert!(!s.pro);
        assert_eq!(s.message, "");
        assert_eq!(s.phase, VerifyPhase::Verified { success: true });
    }

    #[test]
    fn failed_verification_falls_back_to_free() {
        let failures = [
            ApiError::Status { endpoint: "/pro/verify", status: 500 },
            ApiError::Decode {
                endpoint: "/pro/verify",
                message: "expected value at line 1 column 1".into(),
            },
        ];
        for error in failures {
            let s = plan_from_result(Err(error));
            assert!(!s.pro);
            assert_eq!(s.phase, VerifyPhase::Verified { success: false });
            assert_eq!(s.message, MESSAGE_FAILED);
            assert_eq!(s.max_notifications(), 10);
            assert!(!s.timer2_gate_open());
        }
    }

    #[test]
    fn successful_verification_reads_the_answer() {
        let response = serde_json::from_value(json!({ "plan": "pro", "max_notifications": 30 })).unwrap();
        let s = plan_from_result(Ok(response));
        assert!(s.pro);
        assert_eq!(s.max_notifications(), 30);
    }
}
