//! Schedule transition (spec §4.C `resolveScheduleTransition`), pure.

use otto_core::{Job, ScheduleKind, TerminalState};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("invalid_cadence")]
    InvalidCadence,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleTransition {
    Reschedule { last_run_at: i64, next_run_at: i64 },
    Finalize { terminal_state: TerminalState, terminal_reason: Option<String>, last_run_at: i64 },
}

/// Map `(schedule kind, cadence, finish time)` to the job's post-run state.
pub fn resolve_schedule_transition(
    job: &Job,
    finished_at: i64,
) -> Result<ScheduleTransition, TransitionError> {
    match job.schedule_kind {
        ScheduleKind::Recurring => {
            let cadence = job.cadence_minutes.filter(|c| *c > 0).ok_or(TransitionError::InvalidCadence)?;
            Ok(ScheduleTransition::Reschedule {
                last_run_at: finished_at,
                next_run_at: finished_at + i64::from(cadence) * 60_000,
            })
        }
        ScheduleKind::Oneshot => Ok(ScheduleTransition::Finalize {
            terminal_state: TerminalState::Completed,
            terminal_reason: None,
            last_run_at: finished_at,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otto_core::JobId;

    fn recurring(cadence: Option<u32>) -> Job {
        Job::new(JobId::new(), "reminder", ScheduleKind::Recurring, cadence, None, None, None, None, 1_000, 0)
    }

    fn oneshot() -> Job {
        Job::new(JobId::new(), "reminder", ScheduleKind::Oneshot, None, Some(1_000), None, None, None, 1_000, 0)
    }

    #[test]
    fn recurring_job_reschedules_by_cadence() {
        let job = recurring(Some(30));
        let transition = resolve_schedule_transition(&job, 2_000).unwrap();
        assert_eq!(
            transition,
            ScheduleTransition::Reschedule { last_run_at: 2_000, next_run_at: 2_000 + 30 * 60_000 }
        );
    }

    #[test]
    fn recurring_job_with_zero_cadence_errors() {
        let job = recurring(Some(0));
        assert_eq!(resolve_schedule_transition(&job, 2_000), Err(TransitionError::InvalidCadence));
    }

    #[test]
    fn recurring_job_missing_cadence_errors() {
        let job = recurring(None);
        assert_eq!(resolve_schedule_transition(&job, 2_000), Err(TransitionError::InvalidCadence));
    }

    #[test]
    fn oneshot_job_finalizes_as_completed() {
        let job = oneshot();
        let transition = resolve_schedule_transition(&job, 2_000).unwrap();
        assert_eq!(
            transition,
            ScheduleTransition::Finalize {
                terminal_state: TerminalState::Completed,
                terminal_reason: None,
                last_run_at: 2_000,
            }
        );
    }
}
