//! Scans recent failed runs and decides whether to alert (spec §4.H).

use otto_core::{NewOutboundMessage, Priority};
use otto_storage::{EnqueueOutcome, JobsRepo, OutboundRepo};

use crate::dedupe::sha256_16;

#[derive(Debug, Clone)]
pub struct WatchdogConfig {
    pub lookback_minutes: u32,
    pub max_failures: u32,
    pub threshold: u32,
    pub notify: bool,
    pub exclude_task_types: Vec<String>,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self { lookback_minutes: 120, max_failures: 50, threshold: 3, notify: true, exclude_task_types: Vec::new() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationStatus {
    NoChatId,
    NotRequested,
    Enqueued,
    Duplicate,
}

#[derive(Debug, Clone)]
pub struct WatchdogOutcome {
    pub failed_count: usize,
    pub should_alert: bool,
    pub notification_status: NotificationStatus,
}

pub fn check_task_failures(
    jobs: &JobsRepo,
    outbound: &OutboundRepo,
    default_chat_id: Option<i64>,
    config: &WatchdogConfig,
    now: i64,
) -> WatchdogOutcome {
    let since = now - config.lookback_minutes as i64 * 60_000;
    let rows: Vec<_> = jobs
        .list_recent_failed_runs(since, config.max_failures as usize)
        .into_iter()
        .filter(|r| !config.exclude_task_types.iter().any(|t| t == job_type_of(jobs, r)))
        .collect();

    let should_alert = rows.len() as u32 >= config.threshold;

    let notification_status = if !config.notify || !should_alert {
        NotificationStatus::NotRequested
    } else if let Some(chat_id) = default_chat_id {
        let mut job_ids: Vec<String> = rows.iter().map(|r| r.job_id.to_string()).collect();
        job_ids.sort();
        let since_bucket = since / 60_000;
        let signature = job_ids.join(",");
        let dedupe_key = format!("watchdog:{}", sha256_16(&format!("{since_bucket}:{signature}")));

        let top_types = top_error_messages(&rows, 2);
        let content = format!(
            "Watchdog: {} failed runs in the last {} minutes.{}",
            rows.len(),
            config.lookback_minutes,
            if top_types.is_empty() { String::new() } else { format!(" Recent: {}", top_types.join("; ")) }
        );

        let new_message = NewOutboundMessage::text(chat_id, content).with_priority(Priority::High).with_dedupe_key(dedupe_key);
        match outbound.enqueue_or_ignore_dedupe(new_message, now) {
            Ok((EnqueueOutcome::Enqueued, _)) => NotificationStatus::Enqueued,
            Ok((EnqueueOutcome::Duplicate, _)) => NotificationStatus::Duplicate,
            Err(_) => NotificationStatus::NotRequested,
        }
    } else {
        NotificationStatus::NoChatId
    };

    WatchdogOutcome { failed_count: rows.len(), should_alert, notification_status }
}

fn job_type_of(jobs: &JobsRepo, run: &otto_core::JobRun) -> String {
    jobs.get_by_id(&run.job_id).map(|j| j.job_type).unwrap_or_default()
}

fn top_error_messages(rows: &[otto_core::JobRun], limit: usize) -> Vec<String> {
    rows.iter().filter_map(|r| r.error_message.clone()).take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use otto_core::{Job, JobId, RunStatus, ScheduleKind};
    use otto_storage::Store;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn repos() -> (JobsRepo, OutboundRepo) {
        let dir = tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path()).unwrap());
        (JobsRepo::new(store.clone()), OutboundRepo::new(store))
    }

    fn failed_run(jobs: &JobsRepo, job_type: &str, started_at: i64) {
        let job = Job::new(JobId::new(), job_type, ScheduleKind::Oneshot, None, Some(0), None, None, None, 0, 0);
        let job_id = job.id;
        jobs.create_task(job).unwrap();
        let mut run = otto_core::JobRun::placeholder(otto_core::RunId::new(), job_id, started_at, started_at);
        run.status = RunStatus::Failed;
        run.finished_at = Some(started_at + 10);
        run.error_message = Some("boom".into());
        jobs.insert_run(run).unwrap();
    }

    #[test]
    fn alert_fires_once_threshold_met() {
        let (jobs, outbound) = repos();
        for _ in 0..3 {
            failed_run(&jobs, "reminder", 1_000);
        }
        let config = WatchdogConfig { threshold: 3, ..WatchdogConfig::default() };
        let outcome = check_task_failures(&jobs, &outbound, Some(777), &config, 10_000);
        assert_eq!(outcome.failed_count, 3);
        assert!(outcome.should_alert);
        assert_eq!(outcome.notification_status, NotificationStatus::Enqueued);
    }

    #[test]
    fn repeated_alert_in_same_window_is_deduped() {
        let (jobs, outbound) = repos();
        for _ in 0..3 {
            failed_run(&jobs, "reminder", 1_000);
        }
        let config = WatchdogConfig { threshold: 3, ..WatchdogConfig::default() };
        check_task_failures(&jobs, &outbound, Some(777), &config, 10_000);
        let second = check_task_failures(&jobs, &outbound, Some(777), &config, 10_100);
        assert_eq!(second.notification_status, NotificationStatus::Duplicate);
    }

    #[test]
    fn missing_chat_id_reports_no_chat_id() {
        let (jobs, outbound) = repos();
        for _ in 0..3 {
            failed_run(&jobs, "reminder", 1_000);
        }
        let config = WatchdogConfig { threshold: 3, ..WatchdogConfig::default() };
        let outcome = check_task_failures(&jobs, &outbound, None, &config, 10_000);
        assert_eq!(outcome.notification_status, NotificationStatus::NoChatId);
    }

    #[test]
    fn below_threshold_does_not_alert() {
        let (jobs, outbound) = repos();
        failed_run(&jobs, "reminder", 1_000);
        let config = WatchdogConfig { threshold: 3, ..WatchdogConfig::default() };
        let outcome = check_task_failures(&jobs, &outbound, Some(777), &config, 10_000);
        assert!(!outcome.should_alert);
        assert_eq!(outcome.notification_status, NotificationStatus::NotRequested);
    }
}
