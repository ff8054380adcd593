//! Scheduled self-check that summarizes recent runs (spec §4.G).

use std::collections::HashMap;

use otto_core::{
    Job, JobId, NewOutboundMessage, Priority, RunStatus, ScheduleKind, Urgency, HEARTBEAT_JOB_ID,
    HEARTBEAT_JOB_TYPE,
};
use otto_policy::{
    is_profile_onboarding_complete, local_date_key, resolve_effective_profile, resolve_gate_decision,
    EffectiveProfile, GateAction,
};
use otto_storage::{EnqueueOutcome, JobsRepo, OutboundRepo, ProfileRepo};

use crate::dedupe::sha256_16;

/// Idempotent: if the well-known heartbeat job already exists, this is a
/// no-op (spec §4.G `ensureHeartbeatTask`).
pub fn ensure_heartbeat_task(jobs: &JobsRepo, now: i64) {
    let job_id = JobId::from_string(HEARTBEAT_JOB_ID);
    if jobs.get_by_id(&job_id).is_some() {
        return;
    }
    let job = Job::new(job_id, HEARTBEAT_JOB_TYPE, ScheduleKind::Recurring, Some(1), None, None, None, None, now, now);
    let _ = jobs.create_task(job);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatReason {
    SignalEmpty,
    OutsideCadence,
    QuietOrMuted,
    Queued,
    Dedupe,
}

impl HeartbeatReason {
    pub fn as_str(self) -> &'static str {
        match self {
            HeartbeatReason::SignalEmpty => "signal_empty",
            HeartbeatReason::OutsideCadence => "outside_cadence",
            HeartbeatReason::QuietOrMuted => "quiet_or_muted",
            HeartbeatReason::Queued => "queued",
            HeartbeatReason::Dedupe => "dedupe",
        }
    }
}

#[derive(Debug, Clone)]
pub struct HeartbeatOutcome {
    pub emitted: bool,
    pub reason: HeartbeatReason,
}

pub fn run_heartbeat(
    jobs: &JobsRepo,
    outbound: &OutboundRepo,
    profiles: &ProfileRepo,
    chat_id: Option<i64>,
    now: i64,
) -> HeartbeatOutcome {
    let Some(chat_id) = chat_id else {
        return HeartbeatOutcome { emitted: false, reason: HeartbeatReason::SignalEmpty };
    };

    let record = profiles.get();
    let profile = resolve_effective_profile(&record);

    if !is_profile_onboarding_complete(&record) {
        let fingerprint = format!("{chat_id}:{}:onboarding", local_date_key(now, profile.timezone));
        let dedupe_key = format!("heartbeat-onboarding:{}", sha256_16(&fingerprint));
        let message = NewOutboundMessage::text(
            chat_id,
            "Welcome! I can send you periodic check-ins — tell me your timezone and quiet hours to finish setup.",
        )
        .with_dedupe_key(dedupe_key);
        let _ = outbound.enqueue_or_ignore_dedupe(message, now);
        return HeartbeatOutcome { emitted: false, reason: HeartbeatReason::SignalEmpty };
    }

    let now_minutes = otto_policy::local_clock_minutes(now, profile.timezone);
    let window = resolve_due_window(now_minutes, &profile);
    let cadence_ms = profile.heartbeat_cadence_minutes as i64 * 60_000;
    let cadence_active = cadence_ms > 0 && now.rem_euclid(cadence_ms) < 60_000;

    if window.is_none() && !cadence_active {
        return HeartbeatOutcome { emitted: false, reason: HeartbeatReason::OutsideCadence };
    }

    let since = now - profile.heartbeat_cadence_minutes as i64 * 60_000;
    let recent: Vec<_> = jobs
        .list_recent_runs(since, 100)
        .into_iter()
        .filter(|r| jobs.get_by_id(&r.job_id).map(|j| j.job_type != otto_core::HEARTBEAT_JOB_TYPE).unwrap_or(true))
        .collect();

    if profile.heartbeat_only_if_signal && recent.is_empty() {
        return HeartbeatOutcome { emitted: false, reason: HeartbeatReason::SignalEmpty };
    }

    let gate = resolve_gate_decision(&profile, Urgency::Normal, now);
    if gate.action == GateAction::Hold {
        return HeartbeatOutcome { emitted: false, reason: HeartbeatReason::QuietOrMuted };
    }

    let summary = build_summary(jobs, &recent);
    let tz_date = local_date_key(now, profile.timezone);
    let cadence_bucket = if cadence_ms > 0 { now / cadence_ms } else { 0 };
    let fingerprint = match window {
        Some(w) => format!("{tz_date}:{w}"),
        None => format!("{tz_date}:{cadence_bucket}"),
    };
    let dedupe_key = format!("heartbeat:{}", sha256_16(&format!("{chat_id}:{fingerprint}")));
    let message = NewOutboundMessage::text(chat_id, summary).with_priority(Priority::Normal).with_dedupe_key(dedupe_key);

    let reason = match outbound.enqueue_or_ignore_dedupe(message, now) {
        Ok((EnqueueOutcome::Enqueued, _)) => HeartbeatReason::Queued,
        _ => HeartbeatReason::Dedupe,
    };
    let _ = profiles.set_last_digest_at(now, now);

    HeartbeatOutcome { emitted: reason == HeartbeatReason::Queued, reason }
}

fn resolve_due_window(now_minutes: u32, profile: &EffectiveProfile) -> Option<&'static str> {
    let windows = [
        ("morning", profile.heartbeat_morning_min),
        ("midday", profile.heartbeat_midday_min),
        ("evening", profile.heartbeat_evening_min),
    ];
    for (name, start) in windows {
        if let Some(start) = start {
            let diff = (now_minutes + 1440 - start) % 1440;
            if diff < 60 {
                return Some(name);
            }
        }
    }
    None
}

fn build_summary(jobs: &JobsRepo, recent: &[otto_core::JobRun]) -> String {
    let mut by_status = HashMap::new();
    let mut by_type: HashMap<String, u32> = HashMap::new();
    for run in recent {
        *by_status.entry(run.status).or_insert(0u32) += 1;
        let job_type = jobs.get_by_id(&run.job_id).map(|j| j.job_type).unwrap_or_else(|| "unknown".into());
        *by_type.entry(job_type).or_insert(0) += 1;
    }

    let mut type_counts: Vec<(String, u32)> = by_type.into_iter().collect();
    type_counts.sort_by_key(|(_, count)| std::cmp::Reverse(*count));
    let top_types: Vec<String> = type_counts.into_iter().take(3).map(|(t, c)| format!("{t}×{c}")).collect();

    let errors: Vec<String> = recent
        .iter()
        .filter(|r| r.status == RunStatus::Failed)
        .filter_map(|r| r.error_message.clone())
        .take(2)
        .collect();

    let mut summary = format!(
        "Heartbeat: {} success, {} failed, {} skipped.",
        by_status.get(&RunStatus::Success).copied().unwrap_or(0),
        by_status.get(&RunStatus::Failed).copied().unwrap_or(0),
        by_status.get(&RunStatus::Skipped).copied().unwrap_or(0),
    );
    if !top_types.is_empty() {
        summary.push_str(&format!(" Top: {}.", top_types.join(", ")));
    }
    if !errors.is_empty() {
        summary.push_str(&format!(" Errors: {}.", errors.join(" | ")));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use otto_core::UserProfile;
    use otto_storage::Store;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn repos() -> (JobsRepo, OutboundRepo, ProfileRepo) {
        let dir = tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path()).unwrap());
        (JobsRepo::new(store.clone()), OutboundRepo::new(store.clone()), ProfileRepo::new(store))
    }

    #[test]
    fn missing_chat_id_reports_signal_empty() {
        let (jobs, outbound, profiles) = repos();
        let outcome = run_heartbeat(&jobs, &outbound, &profiles, None, 0);
        assert!(!outcome.emitted);
        assert_eq!(outcome.reason, HeartbeatReason::SignalEmpty);
    }

    #[test]
    fn incomplete_onboarding_queues_onboarding_prompt_and_does_not_emit() {
        let (jobs, outbound, profiles) = repos();
        let outcome = run_heartbeat(&jobs, &outbound, &profiles, Some(777), 0);
        assert!(!outcome.emitted);
        assert_eq!(outcome.reason, HeartbeatReason::SignalEmpty);
    }

    #[test]
    fn outside_cadence_and_window_skips() {
        let (jobs, outbound, profiles) = repos();
        let mut profile = UserProfile::defaults(0);
        profile.timezone = Some("UTC".into());
        profile.quiet_hours_start = Some("22:00".into());
        profile.quiet_hours_end = Some("07:00".into());
        profile.heartbeat_morning = None;
        profile.heartbeat_midday = None;
        profile.heartbeat_evening = None;
        profile.heartbeat_cadence_minutes = Some(180);
        profiles.upsert(profile).unwrap();
        // now deliberately not on a cadence boundary
        let outcome = run_heartbeat(&jobs, &outbound, &profiles, Some(777), 90 * 60_000);
        assert_eq!(outcome.reason, HeartbeatReason::OutsideCadence);
    }
}
