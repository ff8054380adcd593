//! Repository for [`JobRunSession`] records (spec §3, §4.E).

use std::sync::Arc;

use otto_core::{JobId, JobRunSession, RunId};

use crate::error::StorageResult;
use crate::ops::StorageOp;
use crate::store::Store;

pub struct RunSessionsRepo {
    store: Arc<Store>,
}

impl RunSessionsRepo {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn insert(&self, session: JobRunSession) -> StorageResult<()> {
        self.store.mutate(StorageOp::InsertRunSession(Box::new(session)), |_| ())
    }

    pub fn close(&self, run_id: RunId, closed_at: Option<i64>, close_error_message: Option<String>) -> StorageResult<()> {
        self.store.mutate(StorageOp::CloseRunSession { run_id, closed_at, close_error_message }, |_| ())
    }

    pub fn get_by_run_id(&self, run_id: &RunId) -> Option<JobRunSession> {
        self.store.read(|s| s.run_sessions.get(run_id).cloned())
    }

    pub fn list_active_by_job_id(&self, job_id: &JobId) -> Vec<JobRunSession> {
        self.store.read(|s| {
            s.run_sessions
                .values()
                .filter(|rs| &rs.job_id == job_id && rs.closed_at.is_none())
                .cloned()
                .collect()
        })
    }
}
