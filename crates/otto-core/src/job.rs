//! Job identity and lifecycle state (spec §3 "Job").

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a job.
    pub struct JobId("job-");
}

/// Whether a job fires once or repeats on a fixed cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    Oneshot,
    Recurring,
}

/// Coarse lifecycle status independent of terminal disposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Idle,
    Running,
    Paused,
}

crate::simple_display! {
    JobStatus {
        Idle => "idle",
        Running => "running",
        Paused => "paused",
    }
}

/// Terminal disposition of a job that will never run again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalState {
    Completed,
    Cancelled,
    Failed,
}

crate::simple_display! {
    TerminalState {
        Completed => "completed",
        Cancelled => "cancelled",
        Failed => "failed",
    }
}

/// Job type strings that identify system-managed handlers (spec §4.I:
/// mutation is forbidden on these regardless of lane).
pub const SYSTEM_JOB_TYPES: &[&str] =
    &["heartbeat", "watchdog_failures", "interactive_background_oneshot"];

pub fn is_system_job_type(job_type: &str) -> bool {
    SYSTEM_JOB_TYPES.contains(&job_type)
}

pub const HEARTBEAT_JOB_ID: &str = "system-heartbeat";
pub const HEARTBEAT_JOB_TYPE: &str = "heartbeat";
pub const WATCHDOG_JOB_TYPE: &str = "watchdog_failures";
pub const INTERACTIVE_BACKGROUND_JOB_TYPE: &str = "interactive_background_oneshot";

/// A schedulable unit of work.
///
/// Invariants (enforced by the constructors/mutators below, never by callers
/// poking fields directly from another crate):
/// - `terminal_state.is_some() => next_run_at.is_none() && lock_token.is_none()`
/// - `lock_token.is_some() <=> lock_expires_at.is_some()`
/// - `schedule_kind == Recurring => cadence_minutes > Some(0)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub job_type: String,
    pub schedule_kind: ScheduleKind,
    pub cadence_minutes: Option<u32>,
    pub run_at: Option<i64>,
    pub profile_id: Option<String>,
    pub model_ref: Option<String>,
    pub payload: Option<String>,
    pub status: JobStatus,
    pub last_run_at: Option<i64>,
    pub next_run_at: Option<i64>,
    pub terminal_state: Option<TerminalState>,
    pub terminal_reason: Option<String>,
    pub lock_token: Option<String>,
    pub lock_expires_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Job {
    /// Build a fresh, non-terminal job from a creation request.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: JobId,
        job_type: impl Into<String>,
        schedule_kind: ScheduleKind,
        cadence_minutes: Option<u32>,
        run_at: Option<i64>,
        profile_id: Option<String>,
        model_ref: Option<String>,
        payload: Option<String>,
        next_run_at: i64,
        now: i64,
    ) -> Self {
        Self {
            id,
            job_type: job_type.into(),
            schedule_kind,
            cadence_minutes,
            run_at,
            profile_id,
            model_ref,
            payload,
            status: JobStatus::Idle,
            last_run_at: None,
            next_run_at: Some(next_run_at),
            terminal_state: None,
            terminal_reason: None,
            lock_token: None,
            lock_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// True iff the job is a candidate for claiming at time `t` (spec §3).
    pub fn is_due_at(&self, t: i64) -> bool {
        self.terminal_state.is_none()
            && self.status == JobStatus::Idle
            && self.next_run_at.is_some_and(|n| n <= t)
            && (self.lock_token.is_none() || self.lock_expires_at.is_some_and(|e| e <= t))
    }

    pub fn is_system_managed(&self) -> bool {
        is_system_job_type(&self.job_type)
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal_state.is_some()
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
