//! Repository for [`TaskAudit`] and [`CommandAudit`] records (spec §4.A, §4.I).

use std::sync::Arc;

use otto_core::{AuditEntry, CommandAudit, TaskAudit};

use crate::error::StorageResult;
use crate::ops::StorageOp;
use crate::store::Store;

pub struct AuditRepo {
    store: Arc<Store>,
}

impl AuditRepo {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn insert_task_audit(&self, entry: TaskAudit) -> StorageResult<()> {
        self.store.mutate(StorageOp::InsertTaskAudit(Box::new(entry)), |_| ())
    }

    pub fn insert_command_audit(&self, entry: CommandAudit) -> StorageResult<()> {
        self.store.mutate(StorageOp::InsertCommandAudit(Box::new(entry)), |_| ())
    }

    /// Task and command audit entries interleaved by `created_at`, most
    /// recent first (spec §4.I `tasks/audit/list`).
    pub fn list_recent(&self, limit: usize) -> Vec<AuditEntry> {
        self.store.read(|s| {
            let mut entries: Vec<AuditEntry> = s
                .task_audit
                .iter()
                .cloned()
                .map(AuditEntry::Task)
                .chain(s.command_audit.iter().cloned().map(AuditEntry::Command))
                .collect();
            entries.sort_by_key(|e| std::cmp::Reverse(e.created_at()));
            entries.into_iter().take(limit).collect()
        })
    }

    pub fn list_by_task_id(&self, task_id: &str, limit: usize) -> Vec<TaskAudit> {
        self.store.read(|s| {
            let mut entries: Vec<TaskAudit> =
                s.task_audit.iter().filter(|a| a.task_id == task_id).cloned().collect();
            entries.sort_by_key(|a| std::cmp::Reverse(a.created_at));
            entries.into_iter().take(limit).collect()
        })
    }
}
