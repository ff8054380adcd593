//! `background-jobs/spawn`, `background-jobs/list`, `background-jobs/show`,
//! `background-jobs/cancel` (spec §4.I, §8 scenario 6 "cancel mid-run").

use axum::extract::State;
use axum::Json;
use otto_core::clock::Clock;
use otto_core::{Job, JobId, JobRun, OttoError, ScheduleKind, TerminalState, INTERACTIVE_BACKGROUND_JOB_TYPE};
use otto_engine::{InteractiveBackgroundPayload, InteractiveBackgroundRequest, InteractiveBackgroundSource};
use serde::{Deserialize, Serialize};

use crate::audit;
use crate::error::ApiResult;
use crate::handlers::tasks::JobDto;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnBackgroundJobRequest {
    pub text: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub chat_id: Option<i64>,
    #[serde(default)]
    pub source_message_id: Option<String>,
    #[serde(default)]
    pub surface: Option<String>,
    #[serde(default)]
    pub rationale: Option<String>,
}

pub async fn background_jobs_spawn<C: Clock>(
    State(state): State<AppState<C>>,
    Json(req): Json<SpawnBackgroundJobRequest>,
) -> ApiResult<Json<JobDto>> {
    let now = state.now();

    let payload = InteractiveBackgroundPayload {
        version: 1,
        source: InteractiveBackgroundSource {
            session_id: req.session_id,
            chat_id: req.chat_id,
            source_message_id: req.source_message_id,
            surface: req.surface,
        },
        request: InteractiveBackgroundRequest { text: req.text, requested_at: now, rationale: req.rationale },
    };
    let payload_json = match serde_json::to_string(&payload) {
        Ok(json) => json,
        Err(e) => return audit::finish(&state, "background-jobs/spawn", None, None, Err(OttoError::Internal(e.to_string()))),
    };

    let job = Job::new(
        JobId::new(),
        INTERACTIVE_BACKGROUND_JOB_TYPE,
        ScheduleKind::Oneshot,
        None,
        Some(now),
        None,
        None,
        Some(payload_json),
        now,
        now,
    );

    let result = state.jobs.create_task(job.clone()).map_err(OttoError::from).map(|()| {
        audit::record_task(&state, job.id.as_str(), "spawn", None, Some(&job));
        JobDto::from(job)
    });

    audit::finish(&state, "background-jobs/spawn", None, None, result)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBackgroundJobsRequest {
    #[serde(default)]
    pub limit: Option<usize>,
}

pub async fn background_jobs_list<C: Clock>(
    State(state): State<AppState<C>>,
    Json(req): Json<ListBackgroundJobsRequest>,
) -> ApiResult<Json<Vec<JobDto>>> {
    let limit = req.limit.unwrap_or(50);
    let mut jobs: Vec<Job> =
        state.jobs.list_tasks().into_iter().filter(|j| j.job_type == INTERACTIVE_BACKGROUND_JOB_TYPE).collect();
    jobs.sort_by_key(|j| std::cmp::Reverse(j.created_at));
    jobs.truncate(limit);
    let dtos = jobs.into_iter().map(JobDto::from).collect::<Vec<_>>();
    audit::finish(&state, "background-jobs/list", None, None, Ok(dtos))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowBackgroundJobRequest {
    pub job_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunDto {
    pub id: String,
    pub scheduled_for: i64,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub status: otto_core::RunStatus,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl From<JobRun> for RunDto {
    fn from(run: JobRun) -> Self {
        Self {
            id: run.id.to_string(),
            scheduled_for: run.scheduled_for,
            started_at: run.started_at,
            finished_at: run.finished_at,
            status: run.status,
            error_code: run.error_code,
            error_message: run.error_message,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowBackgroundJobResponse {
    pub job: JobDto,
    pub runs: Vec<RunDto>,
}

pub async fn background_jobs_show<C: Clock>(
    State(state): State<AppState<C>>,
    Json(req): Json<ShowBackgroundJobRequest>,
) -> ApiResult<Json<ShowBackgroundJobResponse>> {
    let job_id = JobId::from_string(&req.job_id);
    let result = match state.jobs.get_by_id(&job_id) {
        Some(job) => {
            let runs = state.jobs.list_runs_by_job_id(&job_id, 20, 0).into_iter().map(RunDto::from).collect();
            Ok(ShowBackgroundJobResponse { job: JobDto::from(job), runs })
        }
        None => Err(OttoError::NotFound),
    };
    audit::finish(&state, "background-jobs/show", None, None, result)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelBackgroundJobRequest {
    pub job_id: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopSessionResult {
    pub session_id: String,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelBackgroundJobResponse {
    pub outcome: &'static str,
    pub terminal_state: TerminalState,
    pub stop_session_results: Vec<StopSessionResult>,
}

pub async fn background_jobs_cancel<C: Clock>(
    State(state): State<AppState<C>>,
    Json(req): Json<CancelBackgroundJobRequest>,
) -> ApiResult<Json<CancelBackgroundJobResponse>> {
    let now = state.now();
    let job_id = JobId::from_string(&req.job_id);

    let before = match state.jobs.get_by_id(&job_id) {
        Some(job) => job,
        None => return audit::finish(&state, "background-jobs/cancel", None, None, Err(OttoError::NotFound)),
    };

    if let Some(terminal_state) = before.terminal_state {
        let response = CancelBackgroundJobResponse {
            outcome: "already_terminal",
            terminal_state,
            stop_session_results: Vec::new(),
        };
        return audit::finish(&state, "background-jobs/cancel", None, None, Ok(response));
    }

    let active_sessions = state.run_sessions.list_active_by_job_id(&job_id);
    let mut stop_session_results = Vec::with_capacity(active_sessions.len());
    for session in &active_sessions {
        let kill_result = state.session_controller.kill(&session.session_id).await;
        let close_error = kill_result.as_ref().err().map(|e| e.to_string());
        let _ = state.run_sessions.close(session.run_id, Some(now), close_error.clone());
        stop_session_results.push(StopSessionResult {
            session_id: session.session_id.clone(),
            status: if close_error.is_none() { "stopped" } else { "stop_failed" },
        });
    }

    let result = state
        .jobs
        .cancel_task(job_id, req.reason.clone(), now)
        .map_err(OttoError::from)
        .and_then(|()| state.jobs.get_by_id(&job_id).ok_or(OttoError::NotFound))
        .map(|after| {
            audit::record_task(&state, after.id.as_str(), "cancel", Some(&before), Some(&after));
            CancelBackgroundJobResponse {
                outcome: "cancelled",
                terminal_state: after.terminal_state.unwrap_or(TerminalState::Cancelled),
                stop_session_results,
            }
        });

    audit::finish(&state, "background-jobs/cancel", None, None, result)
}
