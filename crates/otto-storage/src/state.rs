//! The materialized, in-memory view every repository reads and mutates
//! under a single [`parking_lot::Mutex`] (spec §5: "repositories present a
//! synchronous interface").

use std::collections::HashMap;

use otto_core::{
    CommandAudit, Job, JobId, JobRun, JobRunSession, JobStatus, OutboundId, OutboundMessage,
    OutboundStatus, RunId, SessionBinding, TaskAudit, UserProfile,
};
use serde::{Deserialize, Serialize};

use crate::ops::StorageOp;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterializedState {
    pub jobs: HashMap<JobId, Job>,
    pub runs: HashMap<RunId, JobRun>,
    pub run_sessions: HashMap<RunId, JobRunSession>,
    pub outbound: HashMap<OutboundId, OutboundMessage>,
    pub dedupe_index: HashMap<String, OutboundId>,
    pub profile: UserProfile,
    pub bindings: HashMap<String, SessionBinding>,
    pub session_to_chat: HashMap<String, i64>,
    pub task_audit: Vec<TaskAudit>,
    pub command_audit: Vec<CommandAudit>,
}

impl Default for MaterializedState {
    fn default() -> Self {
        Self {
            jobs: HashMap::new(),
            runs: HashMap::new(),
            run_sessions: HashMap::new(),
            outbound: HashMap::new(),
            dedupe_index: HashMap::new(),
            profile: UserProfile::defaults(0),
            bindings: HashMap::new(),
            session_to_chat: HashMap::new(),
            task_audit: Vec::new(),
            command_audit: Vec::new(),
        }
    }
}

impl MaterializedState {
    pub fn apply(&mut self, op: &StorageOp) {
        match op {
            StorageOp::CreateTask(job) | StorageOp::UpdateTask(job) => {
                self.jobs.insert(job.id, (**job).clone());
            }
            StorageOp::CancelTask { job_id, terminal_reason, now } => {
                if let Some(job) = self.jobs.get_mut(job_id) {
                    job.terminal_state = Some(otto_core::TerminalState::Cancelled);
                    job.terminal_reason = terminal_reason.clone();
                    job.next_run_at = None;
                    job.lock_token = None;
                    job.lock_expires_at = None;
                    job.updated_at = *now;
                }
            }
            StorageOp::RunTaskNow { job_id, scheduled_for, now } => {
                if let Some(job) = self.jobs.get_mut(job_id) {
                    job.next_run_at = Some(*scheduled_for);
                    job.terminal_state = None;
                    job.terminal_reason = None;
                    job.status = JobStatus::Idle;
                    job.lock_token = None;
                    job.lock_expires_at = None;
                    job.updated_at = *now;
                }
            }
            StorageOp::ClaimDue { job_ids, lock_token, lock_expires_at, updated_at } => {
                for id in job_ids {
                    if let Some(job) = self.jobs.get_mut(id) {
                        job.status = JobStatus::Running;
                        job.lock_token = Some(lock_token.clone());
                        job.lock_expires_at = Some(*lock_expires_at);
                        job.updated_at = *updated_at;
                    }
                }
            }
            StorageOp::ReleaseLock { job_id, lock_token, updated_at } => {
                if let Some(job) = self.jobs.get_mut(job_id) {
                    if job.lock_token.as_deref() == Some(lock_token.as_str()) {
                        job.lock_token = None;
                        job.lock_expires_at = None;
                        job.status = JobStatus::Idle;
                        job.updated_at = *updated_at;
                    }
                }
            }
            StorageOp::InsertRun(run) => {
                self.runs.insert(run.id, (**run).clone());
            }
            StorageOp::MarkRunFinished {
                run_id,
                status,
                finished_at,
                error_code,
                error_message,
                result_json,
            } => {
                if let Some(run) = self.runs.get_mut(run_id) {
                    run.status = *status;
                    run.finished_at = Some(*finished_at);
                    run.error_code = error_code.clone();
                    run.error_message = error_message.clone();
                    run.result_json = result_json.clone();
                }
            }
            StorageOp::RescheduleRecurring { job_id, lock_token, last_run_at, next_run_at, updated_at } => {
                if let Some(job) = self.jobs.get_mut(job_id) {
                    if job.lock_token.as_deref() == Some(lock_token.as_str()) {
                        job.last_run_at = Some(*last_run_at);
                        job.next_run_at = Some(*next_run_at);
                        job.status = JobStatus::Idle;
                        job.lock_token = None;
                        job.lock_expires_at = None;
                        job.updated_at = *updated_at;
                    }
                }
            }
            StorageOp::FinalizeOneShot {
                job_id,
                lock_token,
                terminal_state,
                terminal_reason,
                last_run_at,
                updated_at,
            } => {
                if let Some(job) = self.jobs.get_mut(job_id) {
                    if job.lock_token.as_deref() == Some(lock_token.as_str()) {
                        job.last_run_at = Some(*last_run_at);
                        job.terminal_state = Some(*terminal_state);
                        job.terminal_reason = terminal_reason.clone();
                        job.next_run_at = None;
                        job.lock_token = None;
                        job.lock_expires_at = None;
                        job.status = JobStatus::Idle;
                        job.updated_at = *updated_at;
                    }
                }
            }
            StorageOp::InsertRunSession(rs) => {
                self.run_sessions.insert(rs.run_id, (**rs).clone());
            }
            StorageOp::CloseRunSession { run_id, closed_at, close_error_message } => {
                if let Some(rs) = self.run_sessions.get_mut(run_id) {
                    if let Some(c) = closed_at {
                        rs.closed_at = Some(*c);
                    }
                    if close_error_message.is_some() {
                        rs.close_error_message = close_error_message.clone();
                    }
                }
            }
            StorageOp::EnqueueOutbound(msg) => {
                self.insert_outbound(msg);
            }
            StorageOp::EnqueueOutboundOrIgnoreDedupe(msg) => {
                let duplicate = msg
                    .dedupe_key
                    .as_ref()
                    .is_some_and(|k| self.dedupe_index.contains_key(k));
                if !duplicate {
                    self.insert_outbound(msg);
                }
            }
            StorageOp::MarkOutboundSent { id, attempt_count, sent_at } => {
                if let Some(m) = self.outbound.get_mut(id) {
                    m.status = OutboundStatus::Sent;
                    m.attempt_count = *attempt_count;
                    m.sent_at = Some(*sent_at);
                    m.updated_at = *sent_at;
                }
            }
            StorageOp::MarkOutboundRetry { id, attempt_count, next_attempt_at, error_message, updated_at } => {
                if let Some(m) = self.outbound.get_mut(id) {
                    m.status = OutboundStatus::Queued;
                    m.attempt_count = *attempt_count;
                    m.next_attempt_at = *next_attempt_at;
                    m.error_message = Some(error_message.clone());
                    m.updated_at = *updated_at;
                }
            }
            StorageOp::MarkOutboundFailed { id, attempt_count, error_message, failed_at } => {
                if let Some(m) = self.outbound.get_mut(id) {
                    m.status = OutboundStatus::Failed;
                    m.attempt_count = *attempt_count;
                    m.error_message = Some(error_message.clone());
                    m.failed_at = Some(*failed_at);
                    m.updated_at = *failed_at;
                }
            }
            StorageOp::UpsertProfile(p) => {
                self.profile = (**p).clone();
            }
            StorageOp::SetMuteUntil { mute_until, updated_at } => {
                self.profile.mute_until = *mute_until;
                self.profile.updated_at = *updated_at;
            }
            StorageOp::SetLastDigestAt { last_digest_at, updated_at } => {
                self.profile.last_digest_at = Some(*last_digest_at);
                self.profile.updated_at = *updated_at;
            }
            StorageOp::UpsertBinding(binding) => {
                if let Some(chat_id) = binding.chat_id {
                    self.session_to_chat.insert(binding.session_id.clone(), chat_id);
                }
                self.bindings.insert(binding.binding_key.clone(), (**binding).clone());
            }
            StorageOp::InsertTaskAudit(a) => self.task_audit.push((**a).clone()),
            StorageOp::InsertCommandAudit(a) => self.command_audit.push((**a).clone()),
        }
    }

    fn insert_outbound(&mut self, msg: &OutboundMessage) {
        if let Some(key) = &msg.dedupe_key {
            self.dedupe_index.insert(key.clone(), msg.id);
        }
        self.outbound.insert(msg.id, msg.clone());
    }
}
