//! Executes one claimed job end to end (spec §4.E).

use std::sync::Arc;

use otto_core::{
    error::run_error_code, task_session_binding_key, Job, JobRun, JobRunSession, NewOutboundMessage,
    Priority, RunId, RunStatus, SessionBinding, HEARTBEAT_JOB_TYPE, INTERACTIVE_BACKGROUND_JOB_TYPE,
    WATCHDOG_JOB_TYPE,
};
use otto_gateway::SessionGateway;
use otto_policy::{resolve_schedule_transition, ScheduleTransition};
use otto_storage::{BindingsRepo, JobsRepo, OutboundRepo, ProfileRepo, RunSessionsRepo};
use tracing::{error, warn};

use crate::heartbeat::run_heartbeat;
use crate::payload::{InteractiveBackgroundPayload, ResultError, ResultStatus, StructuredResult, WatchdogPayload};
use crate::result::{parse_structured_result, ParsedResult};
use crate::watchdog::{check_task_failures, NotificationStatus, WatchdogConfig};

/// The collaborators the execution engine needs, bundled so the scheduler
/// only has to thread one value through.
pub struct Executor<G: SessionGateway> {
    pub jobs: Arc<JobsRepo>,
    pub outbound: Arc<OutboundRepo>,
    pub profiles: Arc<ProfileRepo>,
    pub bindings: Arc<BindingsRepo>,
    pub run_sessions: Arc<RunSessionsRepo>,
    pub session_gateway: Arc<G>,
    pub default_chat_id: Option<i64>,
}

impl<G: SessionGateway> Executor<G> {
    /// Entry point invoked by the scheduler for a job it just claimed.
    /// `job.lock_token` MUST be set; failures are swallowed here so they
    /// never propagate to the scheduler tick.
    pub async fn execute_claimed_job(&self, job: Job, now: i64) {
        if job.lock_token.is_none() {
            error!(job_id = %job.id, "execute_claimed_job called without a lock token");
            return;
        }

        let run_id = RunId::new();
        let scheduled_for = job.next_run_at.unwrap_or(now);
        let placeholder = JobRun::placeholder(run_id, job.id, scheduled_for, now);
        if let Err(e) = self.jobs.insert_run(placeholder) {
            warn!(job_id = %job.id, error = %e, "failed to insert placeholder run");
        }

        match job.job_type.as_str() {
            WATCHDOG_JOB_TYPE => self.run_watchdog(&job, run_id, now).await,
            HEARTBEAT_JOB_TYPE => self.run_heartbeat(&job, run_id, now).await,
            INTERACTIVE_BACKGROUND_JOB_TYPE => self.run_interactive_background(&job, run_id, now).await,
            _ => self.run_default(&job, run_id, now).await,
        }
    }

    async fn run_watchdog(&self, job: &Job, run_id: RunId, now: i64) {
        let payload = WatchdogPayload::parse(job.payload.as_deref());
        let config = WatchdogConfig {
            lookback_minutes: payload.lookback_minutes,
            max_failures: payload.max_failures,
            threshold: payload.threshold,
            notify: payload.notify,
            exclude_task_types: Vec::new(),
        };
        let chat_id = payload.chat_id.or(self.default_chat_id);
        let outcome = check_task_failures(&self.jobs, &self.outbound, chat_id, &config, now);

        let result = if outcome.should_alert && outcome.notification_status == NotificationStatus::NoChatId {
            StructuredResult {
                status: ResultStatus::Failed,
                summary: format!("{} failed runs found but no chat is configured to notify", outcome.failed_count),
                errors: vec![ResultError {
                    code: run_error_code::WATCHDOG_NOTIFICATION_UNAVAILABLE.to_string(),
                    message: "no default chat id configured".to_string(),
                }],
                raw_output: None,
            }
        } else {
            StructuredResult {
                status: ResultStatus::Success,
                summary: format!(
                    "examined {} recent failures; notification {:?}",
                    outcome.failed_count, outcome.notification_status
                ),
                errors: Vec::new(),
                raw_output: None,
            }
        };

        self.finalize(job, run_id, result, now);
    }

    async fn run_heartbeat(&self, job: &Job, run_id: RunId, now: i64) {
        let payload_chat_id = job
            .payload
            .as_deref()
            .and_then(|p| serde_json::from_str::<serde_json::Value>(p).ok())
            .and_then(|v| v.get("chat_id").and_then(|c| c.as_i64()));
        let chat_id = payload_chat_id.or(self.default_chat_id);
        let outcome = run_heartbeat(&self.jobs, &self.outbound, &self.profiles, chat_id, now);

        let result = StructuredResult {
            status: ResultStatus::Success,
            summary: format!("heartbeat emitted={} reason={}", outcome.emitted, outcome.reason.as_str()),
            errors: Vec::new(),
            raw_output: None,
        };
        self.finalize(job, run_id, result, now);
    }

    async fn run_interactive_background(&self, job: &Job, run_id: RunId, now: i64) {
        let payload = match InteractiveBackgroundPayload::parse(job.payload.as_deref()) {
            Ok(p) => p,
            Err(e) => {
                let result = StructuredResult {
                    status: ResultStatus::Failed,
                    summary: "invalid background task payload".to_string(),
                    errors: vec![ResultError {
                        code: run_error_code::INVALID_TASK_PAYLOAD.to_string(),
                        message: e.to_string(),
                    }],
                    raw_output: None,
                };
                self.finalize(job, run_id, result, now);
                return;
            }
        };

        let chat_id = payload
            .source
            .chat_id
            .or_else(|| {
                payload
                    .source
                    .session_id
                    .as_deref()
                    .and_then(|sid| self.bindings.get_telegram_chat_id_by_session_id(sid))
            })
            .or(self.default_chat_id);

        if let Some(chat_id) = chat_id {
            let started = NewOutboundMessage::text(chat_id, "Started your background run…")
                .with_dedupe_key(format!("bg-run:{}:{}:started", job.id, run_id));
            let _ = self.outbound.enqueue_or_ignore_dedupe(started, now);
        }

        let prompt = background_prompt(&payload);
        let spawned = self.session_gateway.spawn_session(job, &prompt).await;

        let (session_id, parsed) = match spawned {
            Ok((session_id, raw_output)) => (Some(session_id), parse_structured_result(&raw_output)),
            Err(e) => (None, ParsedResult::GatewayFailed { message: e.to_string() }),
        };

        if let Some(session_id) = &session_id {
            let _ = self.run_sessions.insert(JobRunSession::new(run_id, job.id, session_id.clone(), now));
        }

        let result = parsed_result_to_structured(parsed, run_error_code::TASK_EXECUTION_ERROR);

        let mut close_error = None;
        if let Some(session_id) = &session_id {
            if let Err(e) = self.session_gateway.close_session(session_id).await {
                close_error = Some(e.to_string());
            }
            let _ = self.run_sessions.close(run_id, Some(now), close_error.clone());
        }

        if let Some(chat_id) = chat_id {
            let (suffix, priority) = match result.status {
                ResultStatus::Success => ("final_success", Priority::Normal),
                ResultStatus::Failed => ("final_failed", Priority::High),
                ResultStatus::Skipped => ("final_skipped", Priority::Normal),
            };
            let final_message =
                NewOutboundMessage::text(chat_id, final_message_text(&result))
                    .with_priority(priority)
                    .with_dedupe_key(format!("bg-run:{}:{}:{}", job.id, run_id, suffix));
            let _ = self.outbound.enqueue_or_ignore_dedupe(final_message, now);
        }

        self.finalize(job, run_id, result, now);
    }

    async fn run_default(&self, job: &Job, run_id: RunId, now: i64) {
        let binding_key = task_session_binding_key(&job.id.to_string());
        let existing = self.bindings.get_by_binding_key(&binding_key);
        let prompt = scheduled_prompt(job);

        let outcome = match &existing {
            Some(binding) => self
                .session_gateway
                .send_message(&binding.session_id, &prompt)
                .await
                .map(|raw_output| (binding.session_id.clone(), raw_output)),
            None => self.session_gateway.spawn_session(job, &prompt).await,
        };

        let parsed = match outcome {
            Ok((session_id, raw_output)) => {
                if existing.is_none() {
                    let binding = SessionBinding {
                        binding_key: binding_key.clone(),
                        session_id,
                        chat_id: self.default_chat_id,
                        created_at: now,
                        updated_at: now,
                    };
                    let _ = self.bindings.upsert(binding);
                }
                parse_structured_result(&raw_output)
            }
            Err(e) => ParsedResult::GatewayFailed { message: e.to_string() },
        };

        let result = parsed_result_to_structured(parsed, run_error_code::TASK_EXECUTION_ERROR);
        self.finalize(job, run_id, result, now);
    }

    fn finalize(&self, job: &Job, run_id: RunId, result: StructuredResult, now: i64) {
        let (status, error_code, error_message) = match result.status {
            ResultStatus::Success => (RunStatus::Success, None, None),
            ResultStatus::Skipped => (RunStatus::Skipped, None, None),
            ResultStatus::Failed => {
                let first = result.errors.first();
                let code = first.map(|e| e.code.clone()).unwrap_or_else(|| run_error_code::TASK_FAILED.to_string());
                let message = first.map(|e| e.message.clone()).unwrap_or_else(|| result.summary.clone());
                (RunStatus::Failed, Some(code), Some(message))
            }
        };

        let result_json = serde_json::to_string(&result).ok();
        if let Err(e) = self.jobs.mark_run_finished(run_id, status, now, error_code, error_message, result_json) {
            warn!(job_id = %job.id, error = %e, "failed to mark run finished");
        }

        let lock_token = match job.lock_token.clone() {
            Some(token) => token,
            None => return,
        };

        match resolve_schedule_transition(job, now) {
            Ok(ScheduleTransition::Reschedule { last_run_at, next_run_at }) => {
                if let Err(e) = self.jobs.reschedule_recurring(job.id, lock_token.clone(), last_run_at, next_run_at, now) {
                    warn!(job_id = %job.id, error = %e, "failed to reschedule recurring job");
                    let _ = self.jobs.release_lock(job.id, lock_token, now);
                }
            }
            Ok(ScheduleTransition::Finalize { terminal_state, terminal_reason, last_run_at }) => {
                if let Err(e) =
                    self.jobs.finalize_one_shot(job.id, lock_token.clone(), terminal_state, terminal_reason, last_run_at, now)
                {
                    warn!(job_id = %job.id, error = %e, "failed to finalize one-shot job");
                    let _ = self.jobs.release_lock(job.id, lock_token, now);
                }
            }
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "schedule transition failed, releasing lock");
                let _ = self.jobs.release_lock(job.id, lock_token, now);
            }
        }
    }
}

fn parsed_result_to_structured(parsed: ParsedResult, exception_code: &str) -> StructuredResult {
    match parsed {
        ParsedResult::Ok(result) => result,
        ParsedResult::InvalidJson { raw_output } => StructuredResult {
            status: ResultStatus::Failed,
            summary: "agent output was not valid JSON".to_string(),
            errors: vec![ResultError {
                code: run_error_code::INVALID_RESULT_JSON.to_string(),
                message: "agent output was not valid JSON".to_string(),
            }],
            raw_output: Some(raw_output),
        },
        ParsedResult::InvalidSchema { raw_output } => StructuredResult {
            status: ResultStatus::Failed,
            summary: "agent output did not match the result schema".to_string(),
            errors: vec![ResultError {
                code: run_error_code::INVALID_RESULT_SCHEMA.to_string(),
                message: "agent output did not match the result schema".to_string(),
            }],
            raw_output: Some(raw_output),
        },
        ParsedResult::GatewayFailed { message } => StructuredResult {
            status: ResultStatus::Failed,
            summary: "agent session failed before returning a result".to_string(),
            errors: vec![ResultError { code: exception_code.to_string(), message }],
            raw_output: None,
        },
    }
}

fn background_prompt(payload: &InteractiveBackgroundPayload) -> String {
    format!(
        "Background task requested via {}: {}",
        payload.source.surface.as_deref().unwrap_or("unknown"),
        payload.request.text
    )
}

fn final_message_text(result: &StructuredResult) -> String {
    match result.status {
        ResultStatus::Success => format!("Background run finished: {}", result.summary),
        ResultStatus::Skipped => format!("Background run skipped: {}", result.summary),
        ResultStatus::Failed => format!("Background run failed: {}", result.summary),
    }
}

fn scheduled_prompt(job: &Job) -> String {
    format!("Run scheduled task `{}` now.", job.job_type)
}
