//! The durable core: an in-memory [`MaterializedState`] guarded by a mutex,
//! backed by a WAL of [`StorageOp`]s and periodic snapshots. Repository
//! modules are thin wrappers around [`Store::mutate`] / [`Store::read`].

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::error::StorageResult;
use crate::ops::StorageOp;
use crate::snapshot::{self, Snapshot};
use crate::state::MaterializedState;
use crate::wal::Wal;

/// Checkpoint after this many WAL appends since the last snapshot.
pub const CHECKPOINT_EVERY_OPS: u64 = 500;

pub struct Store {
    state: Mutex<MaterializedState>,
    wal: Mutex<Wal<StorageOp>>,
    snapshot_path: PathBuf,
    ops_since_checkpoint: AtomicU64,
}

impl Store {
    /// Open the store rooted at `dir`, recovering from the last snapshot (if
    /// any) and replaying WAL entries written after it.
    pub fn open(dir: impl AsRef<Path>) -> StorageResult<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let snapshot_path = dir.join("snapshot.json");
        let wal_path = dir.join("otto.wal");

        let loaded = snapshot::read_snapshot(&snapshot_path)?;
        let (mut state, start_seq) = match loaded {
            Some(snap) => {
                info!(wal_seq = snap.wal_seq, "recovered snapshot");
                (snap.state, snap.wal_seq)
            }
            None => (MaterializedState::default(), 0),
        };

        let mut wal = Wal::open(&wal_path, start_seq)?;
        let replayed = wal.replay_after(start_seq)?;
        if !replayed.is_empty() {
            info!(count = replayed.len(), "replaying wal entries since snapshot");
        }
        for entry in &replayed {
            state.apply(&entry.op);
        }

        Ok(Self {
            state: Mutex::new(state),
            wal: Mutex::new(wal),
            snapshot_path,
            ops_since_checkpoint: AtomicU64::new(replayed.len() as u64),
        })
    }

    /// Apply a mutation: append it to the WAL, fold it into the in-memory
    /// state, and return whatever the caller computed from the locked state.
    pub fn mutate<R>(&self, op: StorageOp, f: impl FnOnce(&MaterializedState) -> R) -> StorageResult<R> {
        let mut state = self.state.lock();
        {
            let mut wal = self.wal.lock();
            wal.append(&op)?;
            wal.flush()?;
        }
        state.apply(&op);
        let result = f(&state);
        drop(state);
        self.maybe_checkpoint()?;
        Ok(result)
    }

    /// Compute the mutation from the locked state itself (e.g. "which jobs
    /// are due right now") and apply it atomically, so no other caller can
    /// observe or act on the same state in between.
    pub fn mutate_computed<R>(&self, compute: impl FnOnce(&MaterializedState) -> (StorageOp, R)) -> StorageResult<R> {
        let mut state = self.state.lock();
        let (op, result) = compute(&state);
        {
            let mut wal = self.wal.lock();
            wal.append(&op)?;
            wal.flush()?;
        }
        state.apply(&op);
        drop(state);
        self.maybe_checkpoint()?;
        Ok(result)
    }

    pub fn read<R>(&self, f: impl FnOnce(&MaterializedState) -> R) -> R {
        let state = self.state.lock();
        f(&state)
    }

    fn maybe_checkpoint(&self) -> StorageResult<()> {
        if self.ops_since_checkpoint.fetch_add(1, Ordering::SeqCst) + 1 < CHECKPOINT_EVERY_OPS {
            return Ok(());
        }
        self.checkpoint()
    }

    pub fn checkpoint(&self) -> StorageResult<()> {
        let state = self.state.lock();
        let mut wal = self.wal.lock();
        let seq = wal.write_seq();
        let snap = Snapshot {
            version: 1,
            wal_seq: seq,
            taken_at: chrono::Utc::now().timestamp_millis(),
            state: state.clone(),
        };
        drop(state);
        if let Err(e) = snapshot::write_snapshot(&self.snapshot_path, &snap) {
            warn!(error = %e, "snapshot write failed, wal retained");
            return Err(e);
        }
        wal.compact(seq)?;
        self.ops_since_checkpoint.store(0, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otto_core::{Job, JobId, ScheduleKind};
    use tempfile::tempdir;

    fn sample_job() -> Job {
        Job::new(
            JobId::new(),
            "demo",
            ScheduleKind::Oneshot,
            None,
            Some(1_000),
            None,
            None,
            None,
            1_000,
            0,
        )
    }

    #[test]
    fn open_on_empty_dir_starts_fresh() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let count = store.read(|s| s.jobs.len());
        assert_eq!(count, 0);
    }

    #[test]
    fn mutate_persists_across_reopen_via_wal_replay() {
        let dir = tempdir().unwrap();
        let job = sample_job();
        let job_id = job.id;
        {
            let store = Store::open(dir.path()).unwrap();
            store.mutate(StorageOp::CreateTask(Box::new(job)), |_| ()).unwrap();
        }
        let reopened = Store::open(dir.path()).unwrap();
        assert!(reopened.read(|s| s.jobs.contains_key(&job_id)));
    }

    #[test]
    fn checkpoint_then_reopen_recovers_from_snapshot() {
        let dir = tempdir().unwrap();
        let job = sample_job();
        let job_id = job.id;
        {
            let store = Store::open(dir.path()).unwrap();
            store.mutate(StorageOp::CreateTask(Box::new(job)), |_| ()).unwrap();
            store.checkpoint().unwrap();
        }
        let reopened = Store::open(dir.path()).unwrap();
        assert!(reopened.read(|s| s.jobs.contains_key(&job_id)));
    }
}
