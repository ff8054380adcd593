//! Versioned snapshot of [`MaterializedState`], checkpointed to disk
//! periodically so WAL replay on startup only has to cover recent history.
//!
//! Rotation scheme matches the teacher: up to [`MAX_BAK_FILES`] previous
//! snapshots are kept as `<name>.bak.1` .. `<name>.bak.N` so a torn write
//! during checkpointing never loses the last good snapshot.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StorageResult;
use crate::state::MaterializedState;

pub const MAX_BAK_FILES: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub wal_seq: u64,
    pub taken_at: i64,
    pub state: MaterializedState,
}

pub fn write_snapshot(path: impl AsRef<Path>, snapshot: &Snapshot) -> StorageResult<()> {
    let path = path.as_ref();
    rotate_bak_files(path)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(snapshot)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn read_snapshot(path: impl AsRef<Path>) -> StorageResult<Option<Snapshot>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(path)?;
    Ok(Some(serde_json::from_slice(&bytes)?))
}

fn rotate_bak_path(path: &Path, index: u32) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".bak.{index}"));
    PathBuf::from(name)
}

fn rotate_bak_files(path: &Path) -> StorageResult<()> {
    if !path.exists() {
        return Ok(());
    }
    let oldest = rotate_bak_path(path, MAX_BAK_FILES);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for index in (1..MAX_BAK_FILES).rev() {
        let from = rotate_bak_path(path, index);
        if from.exists() {
            fs::rename(&from, rotate_bak_path(path, index + 1))?;
        }
    }
    fs::copy(path, rotate_bak_path(path, 1))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let snap = Snapshot { version: 1, wal_seq: 7, taken_at: 1_000, state: MaterializedState::default() };
        write_snapshot(&path, &snap).unwrap();
        let loaded = read_snapshot(&path).unwrap().unwrap();
        assert_eq!(loaded.wal_seq, 7);
        assert_eq!(loaded.taken_at, 1_000);
    }

    #[test]
    fn missing_snapshot_returns_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert!(read_snapshot(&path).unwrap().is_none());
    }

    #[test]
    fn repeated_writes_rotate_bak_files_up_to_cap() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        for seq in 0..5 {
            let snap = Snapshot { version: 1, wal_seq: seq, taken_at: seq as i64, state: MaterializedState::default() };
            write_snapshot(&path, &snap).unwrap();
        }
        assert!(rotate_bak_path(&path, 1).exists());
        assert!(rotate_bak_path(&path, MAX_BAK_FILES).exists());
        assert!(!rotate_bak_path(&path, MAX_BAK_FILES + 1).exists());
    }
}
