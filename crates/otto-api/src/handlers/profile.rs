//! `notification-profile/get` / `notification-profile/set` (spec §4.I,
//! §4.B).

use axum::extract::State;
use axum::Json;
use chrono_tz::Tz;
use otto_core::clock::Clock;
use otto_core::{OttoError, QuietMode, UserProfile};
use otto_policy::parse_hhmm;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::audit;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileDto {
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

impl From<UserProfile> for UserProfileDto {
    fn from(p: UserProfile) -> Self {
        Self {
            timezone: p.timezone,
            quiet_hours_start: p.quiet_hours_start,
            quiet_hours_end: p.quiet_hours_end,
            quiet_mode: p.quiet_mode,
            mute_until: p.mute_until,
            heartbeat_morning: p.heartbeat_morning,
            heartbeat_midday: p.heartbeat_midday,
            heartbeat_evening: p.heartbeat_evening,
            heartbeat_cadence_minutes: p.heartbeat_cadence_minutes,
            heartbeat_only_if_signal: p.heartbeat_only_if_signal,
            onboarding_completed_at: p.onboarding_completed_at,
            last_digest_at: p.last_digest_at,
            updated_at: p.updated_at,
        }
    }
}

pub async fn notification_profile_get<C: Clock>(
    State(state): State<AppState<C>>,
) -> ApiResult<Json<UserProfileDto>> {
    let profile = state.profiles.get();
    audit::finish(&state, "notification-profile/get", None, None, Ok::<_, OttoError>(UserProfileDto::from(profile)))
}

/// The `Option<Option<T>>` fields distinguish "omitted" (`None`, leave
/// unchanged) from "present as `null`" (`Some(None)`, clear the value) —
/// a plain `Option<T>` can't express the latter since serde_json maps a
/// missing field and an explicit `null` to the same `None`.
fn deserialize_double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetProfileRequest {
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default, deserialize_with = "deserialize_double_option")]
    pub quiet_hours_start: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_double_option")]
    pub quiet_hours_end: Option<Option<String>>,
    #[serde(default)]
    pub quiet_mode: Option<QuietMode>,
    #[serde(default, deserialize_with = "deserialize_double_option")]
    pub mute_until: Option<Option<i64>>,
    #[serde(default)]
    pub mute_for_minutes: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_double_option")]
    pub heartbeat_morning: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_double_option")]
    pub heartbeat_midday: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_double_option")]
    pub heartbeat_evening: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_double_option")]
    pub heartbeat_cadence_minutes: Option<Option<u32>>,
    #[serde(default)]
    pub heartbeat_only_if_signal: Option<bool>,
    #[serde(default)]
    pub mark_onboarding_complete: Option<bool>,
}

const MAX_MUTE_MINUTES: u32 = 7 * 24 * 60;

fn validate_hhmm_opt(value: &Option<String>) -> Result<(), OttoError> {
    match value {
        Some(s) if parse_hhmm(s).is_none() => Err(OttoError::InvalidRequest(format!("not an HH:MM time: {s}"))),
        _ => Ok(()),
    }
}

pub async fn notification_profile_set<C: Clock>(
    State(state): State<AppState<C>>,
    Json(req): Json<SetProfileRequest>,
) -> ApiResult<Json<UserProfileDto>> {
    let now = state.now();
    let result = try_set_profile(&state, req, now);
    audit::finish(&state, "notification-profile/set", None, None, result)
}

fn try_set_profile<C: Clock>(state: &AppState<C>, req: SetProfileRequest, now: i64) -> Result<UserProfileDto, OttoError> {
    let mut profile = state.profiles.get();

    if let Some(tz) = &req.timezone {
        if Tz::from_str(tz).is_err() {
            return Err(OttoError::InvalidRequest(format!("not a valid IANA timezone: {tz}")));
        }
        profile.timezone = Some(tz.clone());
    }
    if let Some(value) = &req.quiet_hours_start {
        validate_hhmm_opt(value)?;
        profile.quiet_hours_start = value.clone();
    }
    if let Some(value) = &req.quiet_hours_end {
        validate_hhmm_opt(value)?;
        profile.quiet_hours_end = value.clone();
    }
    if let Some(mode) = req.quiet_mode {
        profile.quiet_mode = mode;
    }
    if let Some(minutes) = req.mute_for_minutes {
        if minutes == 0 || minutes > MAX_MUTE_MINUTES {
            return Err(OttoError::InvalidRequest(format!("muteForMinutes must be between 1 and {MAX_MUTE_MINUTES}")));
        }
        profile.mute_until = Some(now + i64::from(minutes) * 60_000);
    } else if let Some(value) = req.mute_until {
        profile.mute_until = value;
    }
    if let Some(value) = &req.heartbeat_morning {
        validate_hhmm_opt(value)?;
        profile.heartbeat_morning = value.clone();
    }
    if let Some(value) = &req.heartbeat_midday {
        validate_hhmm_opt(value)?;
        profile.heartbeat_midday = value.clone();
    }
    if let Some(value) = &req.heartbeat_evening {
        validate_hhmm_opt(value)?;
        profile.heartbeat_evening = value.clone();
    }
    if let Some(value) = req.heartbeat_cadence_minutes {
        profile.heartbeat_cadence_minutes = value;
    }
    if let Some(only_if_signal) = req.heartbeat_only_if_signal {
        profile.heartbeat_only_if_signal = only_if_signal;
    }
    if req.mark_onboarding_complete == Some(true) {
        profile.onboarding_completed_at = Some(now);
    }
    profile.updated_at = now;

    state.profiles.upsert(profile.clone()).map_err(OttoError::from)?;
    Ok(UserProfileDto::from(profile))
}
