//! `tasks/audit/list` (spec §4.I): task and command audit rows interleaved
//! by timestamp, most recent first.

use axum::extract::State;
use axum::Json;
use otto_core::clock::Clock;
use otto_core::{AuditEntry, CommandAudit, CommandOutcome, TaskAudit};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAuditDto {
    pub id: String,
    pub task_id: String,
    pub action: String,
    pub before_json: Option<String>,
    pub after_json: Option<String>,
    pub created_at: i64,
}

impl From<TaskAudit> for TaskAuditDto {
    fn from(a: TaskAudit) -> Self {
        Self {
            id: a.id.to_string(),
            task_id: a.task_id,
            action: a.action,
            before_json: a.before_json,
            after_json: a.after_json,
            created_at: a.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandAuditDto {
    pub id: String,
    pub command: String,
    pub lane: Option<String>,
    pub outcome: CommandOutcome,
    pub metadata_json: Option<String>,
    pub error: Option<String>,
    pub created_at: i64,
}

impl From<CommandAudit> for CommandAuditDto {
    fn from(a: CommandAudit) -> Self {
        Self {
            id: a.id.to_string(),
            command: a.command,
            lane: a.lane,
            outcome: a.outcome,
            metadata_json: a.metadata_json,
            error: a.error,
            created_at: a.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditEntryDto {
    Task(TaskAuditDto),
    Command(CommandAuditDto),
}

impl From<AuditEntry> for AuditEntryDto {
    fn from(entry: AuditEntry) -> Self {
        match entry {
            AuditEntry::Task(a) => AuditEntryDto::Task(a.into()),
            AuditEntry::Command(a) => AuditEntryDto::Command(a.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAuditRequest {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub task_id: Option<String>,
}

pub async fn tasks_audit_list<C: Clock>(
    State(state): State<AppState<C>>,
    Json(req): Json<ListAuditRequest>,
) -> ApiResult<Json<Vec<AuditEntryDto>>> {
    let limit = req.limit.unwrap_or(100);
    let entries = match req.task_id {
        Some(task_id) => state.audit.list_by_task_id(&task_id, limit).into_iter().map(AuditEntry::Task).collect(),
        None => state.audit.list_recent(limit),
    };
    let dtos = entries.into_iter().map(AuditEntryDto::from).collect();
    crate::audit::finish(&state, "tasks/audit/list", None, None, Ok(dtos))
}
