//! A single cooperative ticker that claims and dispatches due jobs (spec §4.D).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use otto_core::Clock;
use otto_gateway::SessionGateway;
use otto_storage::JobsRepo;
use tracing::error;

use crate::config::SchedulerConfig;
use crate::executor::Executor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Idle,
    Ticking,
}

/// Drives `Jobs.claim_due` on a fixed cadence and hands claimed jobs to an
/// [`Executor`]. Stopping is one-way; a tick is skipped entirely (not
/// queued) if the previous one has not returned yet.
pub struct Scheduler<C: Clock, G: SessionGateway> {
    jobs: Arc<JobsRepo>,
    executor: Arc<Executor<G>>,
    clock: C,
    config: SchedulerConfig,
    ticking: AtomicBool,
    stopped: AtomicBool,
}

impl<C: Clock, G: SessionGateway> Scheduler<C, G> {
    pub fn new(jobs: Arc<JobsRepo>, executor: Arc<Executor<G>>, clock: C, config: SchedulerConfig) -> Self {
        Self { jobs, executor, clock, config, ticking: AtomicBool::new(false), stopped: AtomicBool::new(false) }
    }

    pub fn state(&self) -> SchedulerState {
        if self.stopped.load(Ordering::SeqCst) {
            SchedulerState::Stopped
        } else if self.ticking.load(Ordering::SeqCst) {
            SchedulerState::Ticking
        } else {
            SchedulerState::Idle
        }
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Run one tick if enabled, not stopped, and not already mid-tick.
    /// Returns the number of jobs claimed (0 if the tick was skipped).
    pub async fn run_tick(&self) -> usize {
        if self.stopped.load(Ordering::SeqCst) || !self.config.enabled {
            return 0;
        }
        if self.ticking.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            return 0;
        }
        let claimed = self.run_tick_inner().await;
        self.ticking.store(false, Ordering::SeqCst);
        claimed
    }

    async fn run_tick_inner(&self) -> usize {
        let now = self.clock.epoch_ms();
        let claimed = match self.jobs.claim_due(now, self.config.batch_size, self.config.lock_lease_ms) {
            Ok(jobs) => jobs,
            Err(e) => {
                error!(error = %e, "claim_due failed");
                return 0;
            }
        };

        for job in &claimed {
            self.executor.execute_claimed_job(job.clone(), now).await;
        }
        claimed.len()
    }

    /// Drive ticks on `tick_ms` cadence until [`Self::stop`] is called.
    /// Intended to run as a standalone tokio task.
    pub async fn run_forever(self: Arc<Self>) {
        let mut interval = tokio::time::interval(std::time::Duration::from_millis(self.config.tick_ms));
        loop {
            interval.tick().await;
            if self.stopped.load(Ordering::SeqCst) {
                break;
            }
            self.run_tick().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otto_core::{FakeClock, Job, JobId, JobStatus, ScheduleKind};
    use otto_gateway::FakeSessionGateway;
    use otto_storage::{BindingsRepo, OutboundRepo, ProfileRepo, RunSessionsRepo, Store};
    use tempfile::tempdir;

    fn scheduler(config: SchedulerConfig) -> (Scheduler<FakeClock, FakeSessionGateway>, Arc<JobsRepo>) {
        let dir = tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path()).unwrap());
        let jobs = Arc::new(JobsRepo::new(store.clone()));
        let executor = Arc::new(Executor {
            jobs: jobs.clone(),
            outbound: Arc::new(OutboundRepo::new(store.clone())),
            profiles: Arc::new(ProfileRepo::new(store.clone())),
            bindings: Arc::new(BindingsRepo::new(store.clone())),
            run_sessions: Arc::new(RunSessionsRepo::new(store)),
            session_gateway: Arc::new(FakeSessionGateway::new()),
            default_chat_id: None,
        });
        let clock = FakeClock::new(1_000_000);
        (Scheduler::new(jobs.clone(), executor, clock, config), jobs)
    }

    fn due_job() -> Job {
        Job::new(JobId::new(), "demo", ScheduleKind::Oneshot, None, Some(1_000_000), None, None, None, 1_000_000, 0)
    }

    #[tokio::test]
    async fn tick_claims_and_executes_due_jobs() {
        let (sched, jobs) = scheduler(SchedulerConfig::default());
        jobs.create_task(due_job()).unwrap();
        let claimed = sched.run_tick().await;
        assert_eq!(claimed, 1);
        assert_eq!(sched.state(), SchedulerState::Idle);
    }

    #[tokio::test]
    async fn stopped_scheduler_never_ticks() {
        let (sched, jobs) = scheduler(SchedulerConfig::default());
        jobs.create_task(due_job()).unwrap();
        sched.stop();
        let claimed = sched.run_tick().await;
        assert_eq!(claimed, 0);
        assert_eq!(sched.state(), SchedulerState::Stopped);
        let job = jobs.list_tasks().remove(0);
        assert_eq!(job.status, JobStatus::Idle);
    }

    #[tokio::test]
    async fn disabled_scheduler_skips_ticks() {
        let (sched, jobs) = scheduler(SchedulerConfig { enabled: false, ..SchedulerConfig::default() });
        jobs.create_task(due_job()).unwrap();
        assert_eq!(sched.run_tick().await, 0);
    }
}
