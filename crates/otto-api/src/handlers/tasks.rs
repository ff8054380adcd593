//! `tasks/create`, `tasks/update`, `tasks/delete`, `tasks/list`,
//! `tasks/failures/check` (spec §4.I).

use axum::extract::State;
use axum::Json;
use otto_core::clock::Clock;
use otto_core::{Job, JobId, OttoError, ScheduleKind, TerminalState};
use otto_engine::{check_task_failures, NotificationStatus, WatchdogConfig};
use serde::{Deserialize, Serialize};

use crate::audit;
use crate::error::ApiResult;
use crate::resolve::resolve_chat_id;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    Interactive,
    Scheduled,
}

fn lane_str(lane: Lane) -> &'static str {
    match lane {
        Lane::Interactive => "interactive",
        Lane::Scheduled => "scheduled",
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDto {
    pub id: String,
    pub job_type: String,
    pub schedule_kind: ScheduleKind,
    pub cadence_minutes: Option<u32>,
    pub run_at: Option<i64>,
    pub profile_id: Option<String>,
    pub model_ref: Option<String>,
    pub payload: Option<String>,
    pub status: otto_core::JobStatus,
    pub last_run_at: Option<i64>,
    pub next_run_at: Option<i64>,
    pub terminal_state: Option<TerminalState>,
    pub terminal_reason: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Job> for JobDto {
    fn from(job: Job) -> Self {
        Self {
            id: job.id.to_string(),
            job_type: job.job_type,
            schedule_kind: job.schedule_kind,
            cadence_minutes: job.cadence_minutes,
            run_at: job.run_at,
            profile_id: job.profile_id,
            model_ref: job.model_ref,
            payload: job.payload,
            status: job.status,
            last_run_at: job.last_run_at,
            next_run_at: job.next_run_at,
            terminal_state: job.terminal_state,
            terminal_reason: job.terminal_reason,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

// ---- tasks/create ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub lane: Lane,
    pub job_type: String,
    pub schedule_kind: ScheduleKind,
    #[serde(default)]
    pub cadence_minutes: Option<u32>,
    #[serde(default)]
    pub run_at: Option<i64>,
    #[serde(default)]
    pub profile_id: Option<String>,
    #[serde(default)]
    pub model_ref: Option<String>,
    #[serde(default)]
    pub payload: Option<String>,
}

pub async fn tasks_create<C: Clock>(
    State(state): State<AppState<C>>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<Json<JobDto>> {
    let now = state.now();
    let lane = req.lane;

    if lane == Lane::Scheduled {
        return audit::finish(&state, "tasks/create", Some(lane_str(lane)), None, Err(OttoError::LaneForbidden));
    }
    if otto_core::is_system_job_type(&req.job_type) {
        return audit::finish(&state, "tasks/create", Some(lane_str(lane)), None, Err(OttoError::ForbiddenMutation));
    }

    let next_run_at = match req.schedule_kind {
        ScheduleKind::Oneshot => match req.run_at {
            Some(run_at) => run_at,
            None => {
                let err = OttoError::InvalidRequest("runAt is required for a oneshot task".into());
                return audit::finish(&state, "tasks/create", Some(lane_str(lane)), None, Err(err));
            }
        },
        ScheduleKind::Recurring => {
            if !req.cadence_minutes.is_some_and(|c| c > 0) {
                let err = OttoError::InvalidRequest("cadenceMinutes must be a positive integer for a recurring task".into());
                return audit::finish(&state, "tasks/create", Some(lane_str(lane)), None, Err(err));
            }
            req.run_at.unwrap_or(now)
        }
    };

    let job = Job::new(
        JobId::new(),
        req.job_type,
        req.schedule_kind,
        req.cadence_minutes,
        req.run_at,
        req.profile_id,
        req.model_ref,
        req.payload,
        next_run_at,
        now,
    );

    let result = state.jobs.create_task(job.clone()).map_err(OttoError::from).map(|()| {
        audit::record_task(&state, job.id.as_str(), "create", None, Some(&job));
        JobDto::from(job)
    });

    audit::finish(&state, "tasks/create", Some(lane_str(lane)), None, result)
}

// ---- tasks/update ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub lane: Lane,
    pub job_id: String,
    #[serde(default)]
    pub cadence_minutes: Option<u32>,
    #[serde(default)]
    pub run_at: Option<i64>,
    #[serde(default)]
    pub profile_id: Option<String>,
    #[serde(default)]
    pub model_ref: Option<String>,
    #[serde(default)]
    pub payload: Option<String>,
}

pub async fn tasks_update<C: Clock>(
    State(state): State<AppState<C>>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<JobDto>> {
    let now = state.now();
    let lane = req.lane;

    if lane == Lane::Scheduled {
        return audit::finish(&state, "tasks/update", Some(lane_str(lane)), None, Err(OttoError::LaneForbidden));
    }

    let job_id = JobId::from_string(&req.job_id);
    let before = match state.jobs.get_by_id(&job_id) {
        Some(job) => job,
        None => return audit::finish(&state, "tasks/update", Some(lane_str(lane)), None, Err(OttoError::NotFound)),
    };
    if before.is_system_managed() {
        let err = OttoError::ForbiddenMutation;
        return audit::finish(&state, "tasks/update", Some(lane_str(lane)), None, Err(err));
    }

    let mut after = before.clone();
    if req.cadence_minutes.is_some() {
        after.cadence_minutes = req.cadence_minutes;
    }
    if req.run_at.is_some() {
        after.run_at = req.run_at;
    }
    if req.profile_id.is_some() {
        after.profile_id = req.profile_id;
    }
    if req.model_ref.is_some() {
        after.model_ref = req.model_ref;
    }
    if req.payload.is_some() {
        after.payload = req.payload;
    }

    if after.schedule_kind == ScheduleKind::Recurring && !after.cadence_minutes.is_some_and(|c| c > 0) {
        let err = OttoError::InvalidRequest("cadenceMinutes must be a positive integer for a recurring task".into());
        return audit::finish(&state, "tasks/update", Some(lane_str(lane)), None, Err(err));
    }

    after.updated_at = now;

    let result = state.jobs.update_task(after.clone()).map_err(OttoError::from).map(|()| {
        audit::record_task(&state, after.id.as_str(), "update", Some(&before), Some(&after));
        JobDto::from(after)
    });

    audit::finish(&state, "tasks/update", Some(lane_str(lane)), None, result)
}

// ---- tasks/delete ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTaskRequest {
    pub lane: Lane,
    pub job_id: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTaskResponse {
    pub job_id: String,
    pub terminal_state: TerminalState,
}

pub async fn tasks_delete<C: Clock>(
    State(state): State<AppState<C>>,
    Json(req): Json<DeleteTaskRequest>,
) -> ApiResult<Json<DeleteTaskResponse>> {
    let now = state.now();
    let lane = req.lane;

    if lane == Lane::Scheduled {
        return audit::finish(&state, "tasks/delete", Some(lane_str(lane)), None, Err(OttoError::LaneForbidden));
    }

    let job_id = JobId::from_string(&req.job_id);
    let before = match state.jobs.get_by_id(&job_id) {
        Some(job) => job,
        None => return audit::finish(&state, "tasks/delete", Some(lane_str(lane)), None, Err(OttoError::NotFound)),
    };
    if before.is_system_managed() {
        let err = OttoError::ForbiddenMutation;
        return audit::finish(&state, "tasks/delete", Some(lane_str(lane)), None, Err(err));
    }

    let result = state
        .jobs
        .cancel_task(job_id, req.reason.clone(), now)
        .map_err(OttoError::from)
        .and_then(|()| state.jobs.get_by_id(&job_id).ok_or(OttoError::NotFound))
        .map(|after| {
            audit::record_task(&state, after.id.as_str(), "delete", Some(&before), Some(&after));
            DeleteTaskResponse {
                job_id: after.id.to_string(),
                terminal_state: after.terminal_state.unwrap_or(TerminalState::Cancelled),
            }
        });

    audit::finish(&state, "tasks/delete", Some(lane_str(lane)), None, result)
}

// ---- tasks/list ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksRequest {
    pub lane: Lane,
}

pub async fn tasks_list<C: Clock>(
    State(state): State<AppState<C>>,
    Json(req): Json<ListTasksRequest>,
) -> ApiResult<Json<Vec<JobDto>>> {
    let lane = req.lane;
    let jobs = state.jobs.list_tasks().into_iter().map(JobDto::from).collect::<Vec<_>>();
    audit::finish(&state, "tasks/list", Some(lane_str(lane)), None, Ok(jobs))
}

// ---- tasks/failures/check ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckFailuresRequest {
    pub lane: Lane,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub chat_id: Option<i64>,
    #[serde(default)]
    pub lookback_minutes: Option<u32>,
    #[serde(default)]
    pub threshold: Option<u32>,
    #[serde(default)]
    pub max_failures: Option<u32>,
    #[serde(default)]
    pub notify: Option<bool>,
    #[serde(default)]
    pub exclude_task_types: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckFailuresResponse {
    pub failed_count: usize,
    pub should_alert: bool,
    pub notification_status: &'static str,
}

pub async fn tasks_failures_check<C: Clock>(
    State(state): State<AppState<C>>,
    Json(req): Json<CheckFailuresRequest>,
) -> ApiResult<Json<CheckFailuresResponse>> {
    let now = state.now();
    let lane = req.lane;

    let chat_id = resolve_chat_id(&state, req.chat_id, req.session_id.as_deref()).ok();
    let config = WatchdogConfig {
        lookback_minutes: req.lookback_minutes.unwrap_or(120),
        max_failures: req.max_failures.unwrap_or(50),
        threshold: req.threshold.unwrap_or(3),
        notify: req.notify.unwrap_or(true),
        exclude_task_types: req.exclude_task_types.clone(),
    };
    let outcome = check_task_failures(&state.jobs, &state.outbound, chat_id, &config, now);

    let response = CheckFailuresResponse {
        failed_count: outcome.failed_count,
        should_alert: outcome.should_alert,
        notification_status: match outcome.notification_status {
            NotificationStatus::NoChatId => "no_chat_id",
            NotificationStatus::NotRequested => "not_requested",
            NotificationStatus::Enqueued => "enqueued",
            NotificationStatus::Duplicate => "duplicate",
        },
    };

    audit::finish(&state, "tasks/failures/check", Some(lane_str(lane)), None, Ok(response))
}
