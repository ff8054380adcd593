//! The mutation log alphabet. Every repository mutation is represented here
//! so it can be appended to the WAL and replayed deterministically on
//! startup against a loaded snapshot.

use otto_core::{
    CommandAudit, Job, JobId, JobRun, JobRunSession, OutboundId, OutboundMessage, RunId, RunStatus,
    SessionBinding, TaskAudit, TerminalState, UserProfile,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StorageOp {
    CreateTask(Box<Job>),
    UpdateTask(Box<Job>),
    CancelTask { job_id: JobId, terminal_reason: Option<String>, now: i64 },
    RunTaskNow { job_id: JobId, scheduled_for: i64, now: i64 },
    ClaimDue { job_ids: Vec<JobId>, lock_token: String, lock_expires_at: i64, updated_at: i64 },
    ReleaseLock { job_id: JobId, lock_token: String, updated_at: i64 },
    InsertRun(Box<JobRun>),
    MarkRunFinished {
        run_id: RunId,
        status: RunStatus,
        finished_at: i64,
        error_code: Option<String>,
        error_message: Option<String>,
        result_json: Option<String>,
    },
    RescheduleRecurring {
        job_id: JobId,
        lock_token: String,
        last_run_at: i64,
        next_run_at: i64,
        updated_at: i64,
    },
    FinalizeOneShot {
        job_id: JobId,
        lock_token: String,
        terminal_state: TerminalState,
        terminal_reason: Option<String>,
        last_run_at: i64,
        updated_at: i64,
    },
    InsertRunSession(Box<JobRunSession>),
    CloseRunSession { run_id: RunId, closed_at: Option<i64>, close_error_message: Option<String> },
    EnqueueOutbound(Box<OutboundMessage>),
    EnqueueOutboundOrIgnoreDedupe(Box<OutboundMessage>),
    MarkOutboundSent { id: OutboundId, attempt_count: u32, sent_at: i64 },
    MarkOutboundRetry {
        id: OutboundId,
        attempt_count: u32,
        next_attempt_at: i64,
        error_message: String,
        updated_at: i64,
    },
    MarkOutboundFailed { id: OutboundId, attempt_count: u32, error_message: String, failed_at: i64 },
    UpsertProfile(Box<UserProfile>),
    SetMuteUntil { mute_until: Option<i64>, updated_at: i64 },
    SetLastDigestAt { last_digest_at: i64, updated_at: i64 },
    UpsertBinding(Box<SessionBinding>),
    InsertTaskAudit(Box<TaskAudit>),
    InsertCommandAudit(Box<CommandAudit>),
}
