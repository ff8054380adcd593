//! Append-only audit logs (spec §3 "Audit").

use serde::{Deserialize, Serialize};

crate::define_id! {
    pub struct AuditId("adt-");
}

/// A single job mutation (create/update/cancel/run-now).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAudit {
    pub id: AuditId,
    pub task_id: String,
    pub action: String,
    pub before_json: Option<String>,
    pub after_json: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandOutcome {
    Success,
    Failed,
    Denied,
}

/// A single control-plane API call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandAudit {
    pub id: AuditId,
    pub command: String,
    pub lane: Option<String>,
    pub outcome: CommandOutcome,
    pub metadata_json: Option<String>,
    pub error: Option<String>,
    pub created_at: i64,
}

/// The two audit kinds, interleaved for `tasks/audit/list` (spec §4.I).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditEntry {
    Task(TaskAudit),
    Command(CommandAudit),
}

impl AuditEntry {
    pub fn created_at(&self) -> i64 {
        match self {
            AuditEntry::Task(t) => t.created_at,
            AuditEntry::Command(c) => c.created_at,
        }
    }
}
