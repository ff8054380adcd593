//! Domain types shared by the job orchestration kernel.
//!
//! This crate has no I/O: repositories (`otto-storage`), pure policy
//! (`otto-policy`), and the engine (`otto-engine`) all build on the types
//! defined here.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod audit;
pub mod clock;
pub mod error;
pub mod id;
#[macro_use]
mod macros;
pub mod job;
pub mod outbound;
pub mod profile;
pub mod run;

pub use audit::{AuditEntry, AuditId, CommandAudit, CommandOutcome, TaskAudit};
pub use clock::{Clock, FakeClock, SystemClock};
pub use error::{OttoError, OttoResult};
pub use job::{
    is_system_job_type, Job, JobId, JobStatus, ScheduleKind, TerminalState, HEARTBEAT_JOB_ID,
    HEARTBEAT_JOB_TYPE, INTERACTIVE_BACKGROUND_JOB_TYPE, SYSTEM_JOB_TYPES, WATCHDOG_JOB_TYPE,
};
pub use outbound::{
    NewOutboundMessage, OutboundId, OutboundKind, OutboundMessage, OutboundStatus, Priority,
    Urgency,
};
pub use profile::{task_session_binding_key, QuietMode, SessionBinding, UserProfile};
pub use run::{JobRun, JobRunSession, RunId, RunStatus};
