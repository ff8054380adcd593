//! Task execution engine: scheduler kernel, job dispatch, heartbeat and
//! watchdog task bodies (spec §4.D-§4.H). No I/O beyond what it receives
//! through `otto-storage` repositories and `otto-gateway` collaborators.

mod config;
mod dedupe;
mod executor;
mod heartbeat;
mod payload;
mod result;
mod scheduler;
mod watchdog;

pub use config::{SchedulerConfig, SchedulerConfigError};
pub use dedupe::sha256_16;
pub use executor::Executor;
pub use heartbeat::{ensure_heartbeat_task, run_heartbeat, HeartbeatOutcome, HeartbeatReason};
pub use payload::{
    InteractiveBackgroundPayload, InteractiveBackgroundRequest, InteractiveBackgroundSource, InvalidPayload,
    ResultError, ResultStatus, StructuredResult, WatchdogPayload,
};
pub use result::{parse_structured_result, ParsedResult};
pub use scheduler::{Scheduler, SchedulerState};
pub use watchdog::{check_task_failures, NotificationStatus, WatchdogConfig, WatchdogOutcome};
