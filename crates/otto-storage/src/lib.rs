//! Durable storage: a mutation-log (WAL) over a materialized in-memory
//! state, checkpointed to versioned snapshots, exposed to the rest of the
//! workspace as a handful of narrow repository traits.

mod audit;
mod bindings;
mod error;
mod jobs;
mod ops;
mod outbound;
mod profile;
mod run_sessions;
mod snapshot;
mod state;
mod store;
mod wal;

pub use audit::AuditRepo;
pub use bindings::BindingsRepo;
pub use error::{StorageError, StorageResult};
pub use jobs::JobsRepo;
pub use ops::StorageOp;
pub use outbound::{EnqueueOutcome, OutboundRepo};
pub use profile::ProfileRepo;
pub use run_sessions::RunSessionsRepo;
pub use snapshot::{Snapshot, MAX_BAK_FILES};
pub use state::MaterializedState;
pub use store::{Store, CHECKPOINT_EVERY_OPS};
