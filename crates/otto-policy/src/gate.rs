//! Notification gate decision (spec §4.B `resolveGateDecision`).

use crate::clock_math::{local_clock_minutes, minutes_in_window, next_local_time_at};
use crate::effective_profile::EffectiveProfile;
use otto_core::{QuietMode, Urgency};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateAction {
    DeliverNow,
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateReason {
    Allowed,
    CriticalBypass,
    QuietHours,
    Muted,
}

impl GateReason {
    pub fn as_str(self) -> &'static str {
        match self {
            GateReason::Allowed => "allowed",
            GateReason::CriticalBypass => "critical_bypass",
            GateReason::QuietHours => "quiet_hours",
            GateReason::Muted => "muted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateDecision {
    pub action: GateAction,
    pub reason: GateReason,
    pub release_at: Option<i64>,
}

impl GateDecision {
    fn deliver(reason: GateReason) -> Self {
        Self { action: GateAction::DeliverNow, reason, release_at: None }
    }

    fn hold(reason: GateReason, release_at: i64) -> Self {
        Self { action: GateAction::Hold, reason, release_at: Some(release_at) }
    }
}

/// Pure: `resolve_gate_decision(p, u, t) == resolve_gate_decision(p, u, t)`
/// for any fixed inputs (spec §8 invariant).
///
/// Rules, evaluated in order (spec §4.B):
/// 1. `urgency == Critical` bypasses everything.
/// 2. An active mute holds until `mute_until`.
/// 3. Active quiet hours under `quiet_mode == CriticalOnly` hold until the
///    next local occurrence of `quiet_hours_end`.
/// 4. Otherwise deliver immediately.
pub fn resolve_gate_decision(profile: &EffectiveProfile, urgency: Urgency, now: i64) -> GateDecision {
    if urgency == Urgency::Critical {
        return GateDecision::deliver(GateReason::CriticalBypass);
    }

    if let Some(mute_until) = profile.mute_until {
        if mute_until > now {
            return GateDecision::hold(GateReason::Muted, mute_until);
        }
    }

    if profile.quiet_mode == QuietMode::CriticalOnly {
        if let (Some(start), Some(end)) =
            (profile.quiet_hours_start_min, profile.quiet_hours_end_min)
        {
            let now_minutes = local_clock_minutes(now, profile.timezone);
            if minutes_in_window(now_minutes, start, end) {
                let release_at = next_local_time_at(now, profile.timezone, end);
                return GateDecision::hold(GateReason::QuietHours, release_at);
            }
        }
    }

    GateDecision::deliver(GateReason::Allowed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use otto_core::profile::UserProfile;
    use crate::effective_profile::resolve_effective_profile;

    fn profile_with(mut f: impl FnMut(&mut UserProfile)) -> EffectiveProfile {
        let mut p = UserProfile::defaults(0);
        f(&mut p);
        resolve_effective_profile(&p)
    }

    #[test]
    fn critical_urgency_always_bypasses() {
        let profile = profile_with(|p| {
            p.mute_until = Some(i64::MAX);
        });
        let decision = resolve_gate_decision(&profile, Urgency::Critical, 1_000);
        assert_eq!(decision.action, GateAction::DeliverNow);
        assert_eq!(decision.reason, GateReason::CriticalBypass);
    }

    #[test]
    fn active_mute_holds_until_mute_until() {
        let profile = profile_with(|p| {
            p.mute_until = Some(5_000);
        });
        let decision = resolve_gate_decision(&profile, Urgency::Normal, 1_000);
        assert_eq!(decision.action, GateAction::Hold);
        assert_eq!(decision.reason, GateReason::Muted);
        assert_eq!(decision.release_at, Some(5_000));
    }

    #[test]
    fn expired_mute_does_not_hold() {
        let profile = profile_with(|p| {
            p.mute_until = Some(500);
        });
        let decision = resolve_gate_decision(&profile, Urgency::Normal, 1_000);
        assert_eq!(decision.action, GateAction::DeliverNow);
    }

    #[test]
    fn quiet_hours_hold_when_mode_is_critical_only() {
        use chrono::TimeZone;
        let tz = chrono_tz::Europe::Vienna;
        // 23:30 local on an arbitrary day within the 22:00-07:00 window.
        let local = tz.with_ymd_and_hms(2024, 6, 1, 23, 30, 0).unwrap();
        let now = local.timestamp_millis();
        let profile = profile_with(|p| {
            p.timezone = Some("Europe/Vienna".into());
            p.quiet_hours_start = Some("22:00".into());
            p.quiet_hours_end = Some("07:00".into());
            p.quiet_mode = QuietMode::CriticalOnly;
        });
        let decision = resolve_gate_decision(&profile, Urgency::Normal, now);
        assert_eq!(decision.action, GateAction::Hold);
        assert_eq!(decision.reason, GateReason::QuietHours);
        assert!(decision.release_at.is_some());
    }

    #[test]
    fn quiet_hours_do_not_hold_when_mode_is_off() {
        use chrono::TimeZone;
        let tz = chrono_tz::Europe::Vienna;
        let local = tz.with_ymd_and_hms(2024, 6, 1, 23, 30, 0).unwrap();
        let now = local.timestamp_millis();
        let profile = profile_with(|p| {
            p.timezone = Some("Europe/Vienna".into());
            p.quiet_hours_start = Some("22:00".into());
            p.quiet_hours_end = Some("07:00".into());
            p.quiet_mode = QuietMode::Off;
        });
        let decision = resolve_gate_decision(&profile, Urgency::Normal, now);
        assert_eq!(decision.action, GateAction::DeliverNow);
        assert_eq!(decision.reason, GateReason::Allowed);
    }

    #[test]
    fn decision_is_pure() {
        let profile = profile_with(|p| {
            p.quiet_mode = QuietMode::CriticalOnly;
            p.quiet_hours_start = Some("22:00".into());
            p.quiet_hours_end = Some("07:00".into());
        });
        let a = resolve_gate_decision(&profile, Urgency::Normal, 1_700_000_000_000);
        let b = resolve_gate_decision(&profile, Urgency::Normal, 1_700_000_000_000);
        assert_eq!(a, b);
    }
}
