//! Run records (spec §3 "JobRun", "JobRunSession").

use crate::job::JobId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a job run.
    pub struct RunId("run-");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Failed,
    Skipped,
}

crate::simple_display! {
    RunStatus {
        Success => "success",
        Failed => "failed",
        Skipped => "skipped",
    }
}

/// One execution attempt of a [`crate::job::Job`].
///
/// `finished_at.is_none()` iff `status == Skipped` and the run is still
/// in-flight (the placeholder row inserted at the start of execution).
/// Terminal runs are immutable except for `finished_at`, `status`,
/// `error_code`, `error_message`, `result_json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRun {
    pub id: RunId,
    pub job_id: JobId,
    pub scheduled_for: i64,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub status: RunStatus,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub result_json: Option<String>,
    pub created_at: i64,
}

impl JobRun {
    /// Insert a placeholder run, visible immediately, before the handler runs.
    pub fn placeholder(id: RunId, job_id: JobId, scheduled_for: i64, now: i64) -> Self {
        Self {
            id,
            job_id,
            scheduled_for,
            started_at: now,
            finished_at: None,
            status: RunStatus::Skipped,
            error_code: None,
            error_message: None,
            result_json: None,
            created_at: now,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.finished_at.is_none() && self.status == RunStatus::Skipped
    }
}

/// One agent session opened on behalf of a background run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRunSession {
    pub run_id: RunId,
    pub job_id: JobId,
    pub session_id: String,
    pub created_at: i64,
    pub closed_at: Option<i64>,
    pub close_error_message: Option<String>,
}

impl JobRunSession {
    pub fn new(run_id: RunId, job_id: JobId, session_id: impl Into<String>, now: i64) -> Self {
        Self {
            run_id,
            job_id,
            session_id: session_id.into(),
            created_at: now,
            closed_at: None,
            close_error_message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_run_is_in_flight() {
        let run = JobRun::placeholder(RunId::new(), JobId::new(), 1_000, 1_000);
        assert!(run.is_in_flight());
    }

    #[test]
    fn finished_run_is_not_in_flight() {
        let mut run = JobRun::placeholder(RunId::new(), JobId::new(), 1_000, 1_000);
        run.finished_at = Some(2_000);
        run.status = RunStatus::Success;
        assert!(!run.is_in_flight());
    }
}
