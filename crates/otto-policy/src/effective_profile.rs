//! Effective profile resolution (spec §4.B `resolveEffectiveProfile`).

use crate::clock_math::parse_hhmm;
use chrono_tz::Tz;
use otto_core::profile::{
    DEFAULT_HEARTBEAT_CADENCE_MINUTES, DEFAULT_TIMEZONE, MIN_HEARTBEAT_CADENCE_MINUTES,
};
use otto_core::{QuietMode, UserProfile};
use std::str::FromStr;

/// [`UserProfile`] overlaid on defaults, with the timezone parsed and quiet
/// hours/heartbeat times resolved to minutes-since-midnight.
#[derive(Debug, Clone)]
pub struct EffectiveProfile {
    pub timezone: Tz,
    pub quiet_hours_start_min: Option<u32>,
    pub quiet_hours_end_min: Option<u32>,
    pub quiet_mode: QuietMode,
    pub mute_until: Option<i64>,
    pub heartbeat_morning_min: Option<u32>,
    pub heartbeat_midday_min: Option<u32>,
    pub heartbeat_evening_min: Option<u32>,
    pub heartbeat_cadence_minutes: u32,
    pub heartbeat_only_if_signal: bool,
    pub onboarding_completed_at: Option<i64>,
    pub last_digest_at: Option<i64>,
    pub raw_timezone: Option<String>,
    pub raw_quiet_hours_start: Option<String>,
    pub raw_quiet_hours_end: Option<String>,
}

/// Fill defaults and normalize a stored [`UserProfile`] into an
/// [`EffectiveProfile`]. Deterministic for a given `(record, defaults)`: an
/// unparseable timezone string silently falls back to [`DEFAULT_TIMEZONE`]
/// rather than erroring, since notification delivery must never be blocked
/// by a bad profile value.
pub fn resolve_effective_profile(record: &UserProfile) -> EffectiveProfile {
    let raw_timezone = record.timezone.clone();
    let timezone = raw_timezone
        .as_deref()
        .and_then(|tz| Tz::from_str(tz).ok())
        .unwrap_or_else(|| Tz::from_str(DEFAULT_TIMEZONE).unwrap_or(chrono_tz::UTC));

    let cadence = record
        .heartbeat_cadence_minutes
        .map(|c| c.max(MIN_HEARTBEAT_CADENCE_MINUTES))
        .unwrap_or(DEFAULT_HEARTBEAT_CADENCE_MINUTES);

    EffectiveProfile {
        timezone,
        quiet_hours_start_min: record.quiet_hours_start.as_deref().and_then(parse_hhmm),
        quiet_hours_end_min: record.quiet_hours_end.as_deref().and_then(parse_hhmm),
        quiet_mode: record.quiet_mode,
        mute_until: record.mute_until,
        heartbeat_morning_min: record.heartbeat_morning.as_deref().and_then(parse_hhmm),
        heartbeat_midday_min: record.heartbeat_midday.as_deref().and_then(parse_hhmm),
        heartbeat_evening_min: record.heartbeat_evening.as_deref().and_then(parse_hhmm),
        heartbeat_cadence_minutes: cadence,
        heartbeat_only_if_signal: record.heartbeat_only_if_signal,
        onboarding_completed_at: record.onboarding_completed_at,
        last_digest_at: record.last_digest_at,
        raw_timezone,
        raw_quiet_hours_start: record.quiet_hours_start.clone(),
        raw_quiet_hours_end: record.quiet_hours_end.clone(),
    }
}

/// `isProfileOnboardingComplete` (spec §4.B): true iff `onboarding_completed_at`
/// is set, else a heuristic requiring timezone + both quiet-hour bounds.
pub fn is_profile_onboarding_complete(record: &UserProfile) -> bool {
    if record.onboarding_completed_at.is_some() {
        return true;
    }
    record.timezone.is_some()
        && record.quiet_hours_start.is_some()
        && record.quiet_hours_end.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use otto_core::profile::QuietMode;

    fn blank(now: i64) -> UserProfile {
        UserProfile::defaults(now)
    }

    #[test]
    fn unknown_timezone_falls_back_to_default() {
        let mut p = blank(0);
        p.timezone = Some("Not/AZone".into());
        let eff = resolve_effective_profile(&p);
        assert_eq!(eff.timezone, Tz::from_str(DEFAULT_TIMEZONE).unwrap());
    }

    #[test]
    fn valid_timezone_is_honored() {
        let mut p = blank(0);
        p.timezone = Some("America/New_York".into());
        let eff = resolve_effective_profile(&p);
        assert_eq!(eff.timezone, chrono_tz::America::New_York);
    }

    #[test]
    fn cadence_below_minimum_is_clamped() {
        let mut p = blank(0);
        p.heartbeat_cadence_minutes = Some(5);
        let eff = resolve_effective_profile(&p);
        assert_eq!(eff.heartbeat_cadence_minutes, MIN_HEARTBEAT_CADENCE_MINUTES);
    }

    #[test]
    fn onboarding_complete_via_explicit_flag() {
        let mut p = blank(0);
        p.onboarding_completed_at = Some(123);
        assert!(is_profile_onboarding_complete(&p));
    }

    #[test]
    fn onboarding_complete_via_heuristic() {
        let mut p = blank(0);
        p.timezone = Some("UTC".into());
        p.quiet_hours_start = Some("22:00".into());
        p.quiet_hours_end = Some("07:00".into());
        assert!(is_profile_onboarding_complete(&p));
    }

    #[test]
    fn onboarding_incomplete_when_partial() {
        let mut p = blank(0);
        p.timezone = Some("UTC".into());
        assert!(!is_profile_onboarding_complete(&p));
        p.quiet_mode = QuietMode::Off;
        assert!(!is_profile_onboarding_complete(&p));
    }
}
