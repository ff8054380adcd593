//! Append-only write-ahead log of applied [`crate::ops::StorageOp`]s.
//!
//! Shaped after the teacher's `Wal`: a JSON-lines file, one entry per
//! sequence number, with `next_unprocessed`/`mark_processed` for replay on
//! startup. Unlike the teacher, there is a single writer (this process) and
//! no separate reader cursor beyond what `open()` needs for recovery.

use serde::{de::DeserializeOwned, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{StorageError, StorageResult};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WalEntry<T> {
    pub seq: u64,
    pub op: T,
}

pub struct Wal<T> {
    path: PathBuf,
    file: File,
    write_seq: u64,
    _marker: std::marker::PhantomData<T>,
}

impl<T> Wal<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Open (creating if absent) a WAL file, with the write cursor starting
    /// at `start_seq` (the sequence number of the last snapshot).
    pub fn open(path: impl AsRef<Path>, start_seq: u64) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).read(true).append(true).open(&path)?;
        Ok(Self { path, file, write_seq: start_seq, _marker: std::marker::PhantomData })
    }

    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    pub fn append(&mut self, op: &T) -> StorageResult<u64> {
        self.write_seq += 1;
        let entry = WalEntry { seq: self.write_seq, op };
        let line = serde_json::to_string(&entry)?;
        writeln!(self.file, "{line}")?;
        Ok(self.write_seq)
    }

    pub fn flush(&mut self) -> StorageResult<()> {
        self.file.flush()?;
        Ok(())
    }

    /// Replay every entry with `seq > after_seq`, in order.
    pub fn replay_after(&mut self, after_seq: u64) -> StorageResult<Vec<WalEntry<T>>> {
        let mut reader = BufReader::new(File::open(&self.path)?);
        reader.seek(SeekFrom::Start(0))?;
        let mut out = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: WalEntry<T> = serde_json::from_str(&line)?;
            if entry.seq > after_seq {
                out.push(entry);
            }
        }
        Ok(out)
    }

    /// Truncate the log after a successful snapshot at `seq`, starting a
    /// fresh empty file whose sequence numbering continues from `seq`.
    pub fn compact(&mut self, seq: u64) -> StorageResult<()> {
        let file = OpenOptions::new().create(true).write(true).truncate(true).open(&self.path)?;
        self.file = file;
        self.write_seq = seq;
        Ok(())
    }
}

impl<T> std::fmt::Debug for Wal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wal").field("path", &self.path).field("write_seq", &self.write_seq).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.wal");
        let wal = Wal::<String>::open(&path, 0).unwrap();
        assert!(path.exists());
        assert_eq!(wal.write_seq(), 0);
    }

    #[test]
    fn append_assigns_increasing_sequence_numbers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.wal");
        let mut wal = Wal::<String>::open(&path, 0).unwrap();
        assert_eq!(wal.append(&"a".to_string()).unwrap(), 1);
        assert_eq!(wal.append(&"b".to_string()).unwrap(), 2);
        wal.flush().unwrap();
    }

    #[test]
    fn replay_after_returns_only_newer_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.wal");
        let mut wal = Wal::<String>::open(&path, 0).unwrap();
        wal.append(&"a".to_string()).unwrap();
        wal.append(&"b".to_string()).unwrap();
        wal.append(&"c".to_string()).unwrap();
        wal.flush().unwrap();

        let entries = wal.replay_after(1).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].op, "b");
        assert_eq!(entries[1].op, "c");
    }

    #[test]
    fn compact_resets_sequence_base() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.wal");
        let mut wal = Wal::<String>::open(&path, 0).unwrap();
        wal.append(&"a".to_string()).unwrap();
        wal.compact(1).unwrap();
        assert_eq!(wal.write_seq(), 1);
        assert_eq!(wal.append(&"b".to_string()).unwrap(), 2);
    }
}
