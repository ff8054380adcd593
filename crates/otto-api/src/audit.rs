//! Per-call audit recording (spec §4.I: "every call writes one CommandAudit
//! row at completion"). [`finish`] is the single choke point every handler
//! routes its result through so that invariant can't be forgotten.

use axum::Json;
use otto_core::clock::Clock;
use otto_core::{AuditId, CommandAudit, CommandOutcome, OttoError, TaskAudit};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

fn command_outcome_for(err: &OttoError) -> CommandOutcome {
    match err {
        OttoError::Unauthorized | OttoError::LaneForbidden | OttoError::ForbiddenMutation => CommandOutcome::Denied,
        _ => CommandOutcome::Failed,
    }
}

pub fn record_command<C: Clock>(
    state: &AppState<C>,
    command: &str,
    lane: Option<&str>,
    outcome: CommandOutcome,
    metadata: Option<serde_json::Value>,
    error: Option<String>,
) {
    let entry = CommandAudit {
        id: AuditId::new(),
        command: command.to_string(),
        lane: lane.map(str::to_string),
        outcome,
        metadata_json: metadata.map(|v| v.to_string()),
        error,
        created_at: state.now(),
    };
    if let Err(e) = state.audit.insert_command_audit(entry) {
        tracing::warn!(error = %e, command, "failed to write command audit row");
    }
}

pub fn record_task<C: Clock>(
    state: &AppState<C>,
    task_id: &str,
    action: &str,
    before: Option<&otto_core::Job>,
    after: Option<&otto_core::Job>,
) {
    let entry = TaskAudit {
        id: AuditId::new(),
        task_id: task_id.to_string(),
        action: action.to_string(),
        before_json: before.and_then(|j| serde_json::to_string(j).ok()),
        after_json: after.and_then(|j| serde_json::to_string(j).ok()),
        created_at: state.now(),
    };
    if let Err(e) = state.audit.insert_task_audit(entry) {
        tracing::warn!(error = %e, task_id, action, "failed to write task audit row");
    }
}

/// Record the `CommandAudit` row for this call and turn the result into the
/// axum response, so every handler is forced through one recording path.
pub fn finish<C: Clock, T: Serialize>(
    state: &AppState<C>,
    command: &str,
    lane: Option<&str>,
    metadata: Option<serde_json::Value>,
    result: Result<T, OttoError>,
) -> ApiResult<Json<T>> {
    match result {
        Ok(value) => {
            record_command(state, command, lane, CommandOutcome::Success, metadata, None);
            Ok(Json(value))
        }
        Err(e) => {
            let outcome = command_outcome_for(&e);
            record_command(state, command, lane, outcome, None, Some(e.to_string()));
            Err(ApiError::from(e))
        }
    }
}
