//! The singleton user notification profile (spec §3 "UserProfile").

use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEZONE: &str = "Europe/Vienna";
pub const DEFAULT_HEARTBEAT_CADENCE_MINUTES: u32 = 180;
pub const MIN_HEARTBEAT_CADENCE_MINUTES: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuietMode {
    CriticalOnly,
    Off,
}

/// Persisted user profile row. Absent fields fall back to defaults via
/// [`crate::profile::UserProfile::with_defaults`], not here — the stored
/// record keeps `None` distinguishable from "explicitly set to the default".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub timezone: Option<String>,
    pub quiet_hours_start: Option<String>,
    pub quiet_hours_end: Option<String>,
    pub quiet_mode: QuietMode,
    pub mute_until: Option<i64>,
    pub heartbeat_morning: Option<String>,
    pub heartbeat_midday: Option<String>,
    pub heartbeat_evening: Option<String>,
    pub heartbeat_cadence_minutes: Option<u32>,
    pub heartbeat_only_if_signal: bool,
    pub onboarding_completed_at: Option<i64>,
    pub last_digest_at: Option<i64>,
    pub updated_at: i64,
}

impl UserProfile {
    pub fn defaults(now: i64) -> Self {
        Self {
            timezone: None,
            quiet_hours_start: None,
            quiet_hours_end: None,
            quiet_mode: QuietMode::Off,
            mute_until: None,
            heartbeat_morning: Some("08:00".into()),
            heartbeat_midday: Some("13:00".into()),
            heartbeat_evening: Some("20:00".into()),
            heartbeat_cadence_minutes: None,
            heartbeat_only_if_signal: true,
            onboarding_completed_at: None,
            last_digest_at: None,
            updated_at: now,
        }
    }
}

/// `binding_key -> session_id` used both to pin a chat/recurring task to a
/// persistent agent session, and to look up a chat id from an agent session
/// id (spec §3 "SessionBinding").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionBinding {
    pub binding_key: String,
    pub session_id: String,
    pub chat_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

pub fn task_session_binding_key(job_id: &str) -> String {
    format!("scheduler:task:{job_id}:assistant")
}
