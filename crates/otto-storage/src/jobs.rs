//! Repository for [`Job`] and [`JobRun`] records (spec §4.A).

use std::sync::Arc;

use nanoid::nanoid;
use otto_core::{Job, JobId, JobRun, RunId, RunStatus, TerminalState};

use crate::error::{StorageError, StorageResult};
use crate::ops::StorageOp;
use crate::store::Store;

pub struct JobsRepo {
    store: Arc<Store>,
}

impl JobsRepo {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn get_by_id(&self, job_id: &JobId) -> Option<Job> {
        self.store.read(|s| s.jobs.get(job_id).cloned())
    }

    pub fn create_task(&self, job: Job) -> StorageResult<()> {
        self.store.mutate(StorageOp::CreateTask(Box::new(job)), |_| ())
    }

    pub fn update_task(&self, job: Job) -> StorageResult<()> {
        if self.get_by_id(&job.id).is_none() {
            return Err(StorageError::NotFound);
        }
        self.store.mutate(StorageOp::UpdateTask(Box::new(job)), |_| ())
    }

    pub fn cancel_task(&self, job_id: JobId, terminal_reason: Option<String>, now: i64) -> StorageResult<()> {
        if self.get_by_id(&job_id).is_none() {
            return Err(StorageError::NotFound);
        }
        self.store.mutate(StorageOp::CancelTask { job_id, terminal_reason, now }, |_| ())
    }

    /// Idempotent: calling this on an already-idle, already-due job is a
    /// harmless no-op reschedule to `scheduled_for`.
    pub fn run_task_now(&self, job_id: JobId, scheduled_for: i64, now: i64) -> StorageResult<()> {
        if self.get_by_id(&job_id).is_none() {
            return Err(StorageError::NotFound);
        }
        self.store.mutate(StorageOp::RunTaskNow { job_id, scheduled_for, now }, |_| ())
    }

    pub fn list_tasks(&self) -> Vec<Job> {
        self.store.read(|s| {
            let mut jobs: Vec<Job> = s.jobs.values().cloned().collect();
            jobs.sort_by_key(|j| j.created_at);
            jobs
        })
    }

    pub fn list_runs_by_job_id(&self, job_id: &JobId, limit: usize, offset: usize) -> Vec<JobRun> {
        self.store.read(|s| {
            let mut runs: Vec<JobRun> = s.runs.values().filter(|r| &r.job_id == job_id).cloned().collect();
            runs.sort_by_key(|r| std::cmp::Reverse(r.scheduled_for));
            runs.into_iter().skip(offset).take(limit).collect()
        })
    }

    pub fn count_runs_by_job_id(&self, job_id: &JobId) -> usize {
        self.store.read(|s| s.runs.values().filter(|r| &r.job_id == job_id).count())
    }

    pub fn get_run_by_id(&self, run_id: &RunId) -> Option<JobRun> {
        self.store.read(|s| s.runs.get(run_id).cloned())
    }

    pub fn list_recent_failed_runs(&self, since: i64, limit: usize) -> Vec<JobRun> {
        self.store.read(|s| {
            let mut runs: Vec<JobRun> = s
                .runs
                .values()
                .filter(|r| r.status == RunStatus::Failed && r.started_at >= since)
                .cloned()
                .collect();
            runs.sort_by_key(|r| std::cmp::Reverse(r.scheduled_for));
            runs.into_iter().take(limit).collect()
        })
    }

    pub fn list_recent_runs(&self, since: i64, limit: usize) -> Vec<JobRun> {
        self.store.read(|s| {
            let mut runs: Vec<JobRun> = s.runs.values().filter(|r| r.started_at >= since).cloned().collect();
            runs.sort_by_key(|r| std::cmp::Reverse(r.scheduled_for));
            runs.into_iter().take(limit).collect()
        })
    }

    pub fn list_due(&self, now: i64) -> Vec<Job> {
        self.store.read(|s| {
            let mut due: Vec<Job> = s.jobs.values().filter(|j| j.is_due_at(now)).cloned().collect();
            due.sort_by_key(|j| j.next_run_at);
            due
        })
    }

    /// Atomically claim up to `limit` jobs due at `now`, stamping them with a
    /// fresh lock token that expires at `now + lease_ms`. Returns the claimed
    /// jobs with their post-claim lock fields already applied.
    pub fn claim_due(&self, now: i64, limit: usize, lease_ms: i64) -> StorageResult<Vec<Job>> {
        self.store.mutate_computed(|s| {
            let mut due: Vec<Job> = s.jobs.values().filter(|j| j.is_due_at(now)).cloned().collect();
            due.sort_by_key(|j| j.next_run_at);
            due.truncate(limit);
            let lock_token = nanoid!(21);
            let lock_expires_at = now + lease_ms;
            let job_ids: Vec<JobId> = due.iter().map(|j| j.id).collect();
            for job in &mut due {
                job.status = otto_core::JobStatus::Running;
                job.lock_token = Some(lock_token.clone());
                job.lock_expires_at = Some(lock_expires_at);
                job.updated_at = now;
            }
            let op = StorageOp::ClaimDue { job_ids, lock_token, lock_expires_at, updated_at: now };
            (op, due)
        })
    }

    pub fn release_lock(&self, job_id: JobId, lock_token: String, now: i64) -> StorageResult<()> {
        self.store.mutate(StorageOp::ReleaseLock { job_id, lock_token, updated_at: now }, |_| ())
    }

    pub fn insert_run(&self, run: JobRun) -> StorageResult<()> {
        self.store.mutate(StorageOp::InsertRun(Box::new(run)), |_| ())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn mark_run_finished(
        &self,
        run_id: RunId,
        status: RunStatus,
        finished_at: i64,
        error_code: Option<String>,
        error_message: Option<String>,
        result_json: Option<String>,
    ) -> StorageResult<()> {
        self.store.mutate(
            StorageOp::MarkRunFinished { run_id, status, finished_at, error_code, error_message, result_json },
            |_| (),
        )
    }

    pub fn reschedule_recurring(
        &self,
        job_id: JobId,
        lock_token: String,
        last_run_at: i64,
        next_run_at: i64,
        now: i64,
    ) -> StorageResult<()> {
        self.store.mutate(
            StorageOp::RescheduleRecurring { job_id, lock_token, last_run_at, next_run_at, updated_at: now },
            |_| (),
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn finalize_one_shot(
        &self,
        job_id: JobId,
        lock_token: String,
        terminal_state: TerminalState,
        terminal_reason: Option<String>,
        last_run_at: i64,
        now: i64,
    ) -> StorageResult<()> {
        self.store.mutate(
            StorageOp::FinalizeOneShot {
                job_id,
                lock_token,
                terminal_state,
                terminal_reason,
                last_run_at,
                updated_at: now,
            },
            |_| (),
        )
    }
}
