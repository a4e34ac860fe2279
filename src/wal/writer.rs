//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::{HawkError, Result};
use super::LogEntry;

/// Writes entries to the WAL file
pub struct WalWriter {
    /// Location of the log file
    path: PathBuf,

    /// Buffered handle; flushed and fsynced according to `sync_strategy`
    writer: BufWriter<File>,

    sync_strategy: WalSyncStrategy,

    /// Entries written since the last fsync
    uncommitted: usize,

    /// Entries written through this handle
    entries_written: u64,
}

impl WalWriter {
    /// Create a fresh WAL file, truncating any existing one
    ///
    /// Missing parent directories are created.
    pub fn create(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        Self::ensure_parent(path)?;
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|e| HawkError::Config(format!("cannot create log {}: {}", path.display(), e)))?;
        Ok(Self::from_file(path, file, sync_strategy))
    }

    /// Open an existing WAL file for appending (creates it if missing)
    pub fn open_append(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        Self::ensure_parent(path)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| HawkError::Config(format!("cannot open log {}: {}", path.display(), e)))?;
        Ok(Self::from_file(path, file, sync_strategy))
    }

    fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                HawkError::Config(format!("cannot create directory {}: {}", parent.display(), e))
            })?;
        }
        Ok(())
    }

    fn from_file(path: &Path, file: File, sync_strategy: WalSyncStrategy) -> Self {
        Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            sync_strategy,
            uncommitted: 0,
            entries_written: 0,
        }
    }

    /// Append an entry to the WAL
    ///
    /// With `EveryWrite` the entry is on stable storage when this returns.
    pub fn append(&mut self, entry: &LogEntry) -> Result<()> {
        let line = entry.encode()?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;

        self.uncommitted += 1;
        self.entries_written += 1;

        let should_sync = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.uncommitted >= count.max(1),
        };
        if should_sync {
            self.sync()?;
        }

        Ok(())
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        self.uncommitted = 0;
        Ok(())
    }

    /// Sync and release the file handle
    pub fn close(mut self) -> Result<()> {
        self.sync()?;
        self.writer
            .into_inner()
            .map_err(|e| HawkError::WalWrite(e.to_string()))?
            .sync_all()?;
        Ok(())
    }

    /// Entries written since the last fsync
    pub fn uncommitted_count(&self) -> usize {
        self.uncommitted
    }

    /// Entries written through this handle
    pub fn entries_written(&self) -> u64 {
        self.entries_written
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sync_strategy(&self) -> WalSyncStrategy {
        self.sync_strategy
    }
}
