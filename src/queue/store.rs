//! Queue store implementation
//!
//! VecDeque-based FIFO with an optional WAL, both behind one RwLock.

use std::collections::VecDeque;
use std::path::Path;

use parking_lot::RwLock;

use crate::config::WalSyncStrategy;
use crate::error::{HawkError, Result};
use crate::wal::{LogEntry, Operation, RecoveryResult, WalRecovery, WalWriter};
use super::Outcome;

/// FIFO message queue with optional write-ahead logging
///
/// ## Concurrency Model
///
/// The message sequence and the WAL handle live behind the same lock, so
/// every mutation and its log append happen as one step:
///
/// - **enqueue / dequeue / close / enable_logging / recover_from_log**:
///   exclusive write guard
/// - **size / messages / is_logging**: shared read guard
///
/// The log order therefore always equals the order in which mutations
/// were applied in memory.
pub struct QueueStore {
    inner: RwLock<Inner>,

    /// Applied to every WAL this store opens
    sync_strategy: WalSyncStrategy,
}

struct Inner {
    messages: VecDeque<String>,

    /// `Some` while logging is enabled
    wal: Option<WalWriter>,
}

impl QueueStore {
    /// Create an empty in-memory queue that fsyncs every log write
    pub fn new() -> Self {
        Self::with_sync_strategy(WalSyncStrategy::EveryWrite)
    }

    /// Create an empty in-memory queue using the given WAL sync strategy
    pub fn with_sync_strategy(sync_strategy: WalSyncStrategy) -> Self {
        Self {
            inner: RwLock::new(Inner {
                messages: VecDeque::new(),
                wal: None,
            }),
            sync_strategy,
        }
    }

    /// Append a message to the tail
    ///
    /// The message is always enqueued. If logging is enabled an ENQUEUE
    /// entry is appended before returning; a failure there is carried in
    /// the returned [`Outcome`] and the enqueue is not undone.
    pub fn enqueue(&self, message: impl Into<String>) -> Outcome<()> {
        let message = message.into();
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        let entry = inner
            .wal
            .as_ref()
            .map(|_| LogEntry::new(Operation::Enqueue, message.clone()));
        inner.messages.push_back(message);

        let wal_error = match (inner.wal.as_mut(), entry) {
            (Some(wal), Some(entry)) => wal.append(&entry).err(),
            _ => None,
        };
        Outcome::new((), wal_error)
    }

    /// Remove and return the head message
    ///
    /// Returns `None` without touching the log when the queue is empty.
    pub fn dequeue(&self) -> Outcome<Option<String>> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        let message = match inner.messages.pop_front() {
            Some(message) => message,
            None => return Outcome::new(None, None),
        };

        let wal_error = match inner.wal.as_mut() {
            Some(wal) => wal
                .append(&LogEntry::new(Operation::Dequeue, message.clone()))
                .err(),
            None => None,
        };
        Outcome::new(Some(message), wal_error)
    }

    /// Number of messages currently queued
    pub fn size(&self) -> usize {
        self.inner.read().messages.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.inner.read().messages.is_empty()
    }

    /// Snapshot of the queued messages, head first
    pub fn messages(&self) -> Vec<String> {
        self.inner.read().messages.iter().cloned().collect()
    }

    /// Whether mutations are currently being logged
    pub fn is_logging(&self) -> bool {
        self.inner.read().wal.is_some()
    }

    /// Start logging to a fresh file at `path`
    ///
    /// Writes a STARTUP marker followed by one ENQUEUE entry per message
    /// already queued, in queue order, and fsyncs. Only then is logging
    /// switched on; on any error the store is left exactly as it was.
    pub fn enable_logging(&self, path: &Path) -> Result<()> {
        let mut guard = self.inner.write();
        if guard.wal.is_some() {
            return Err(HawkError::Config("logging is already enabled".to_string()));
        }

        let mut wal = WalWriter::create(path, self.sync_strategy)?;
        wal.append(&LogEntry::marker(Operation::Startup))?;
        for message in &guard.messages {
            wal.append(&LogEntry::new(Operation::Enqueue, message.as_str()))?;
        }
        wal.sync()?;

        tracing::info!(
            "Logging enabled at {} ({} existing messages seeded)",
            path.display(),
            guard.messages.len()
        );
        guard.wal = Some(wal);
        Ok(())
    }

    /// Replace the queue contents with the replay of the log at `path`,
    /// then keep appending to that log
    ///
    /// A partial write at the end of the log is cut off first. If the
    /// replay fails the store is left unchanged. A log this store was
    /// writing to at another path is closed with a SHUTDOWN marker.
    pub fn recover_from_log(&self, path: &Path) -> Result<RecoveryResult> {
        let mut guard = self.inner.write();

        // The replay must see everything this store has written so far
        if let Some(wal) = guard.wal.as_mut() {
            wal.sync()?;
        }

        let (messages, result) = WalRecovery::recover(path)?;

        let mut wal = WalWriter::open_append(path, self.sync_strategy)?;
        wal.append(&LogEntry::marker(Operation::Startup))?;

        if result.lines_skipped > 0 {
            tracing::warn!(
                "Skipped {} malformed lines while recovering {}",
                result.lines_skipped,
                path.display()
            );
        }
        tracing::info!(
            "Recovered {} messages from {} ({} entries replayed)",
            result.messages,
            path.display(),
            result.entries_replayed
        );

        guard.messages = messages;
        if let Some(previous) = guard.wal.replace(wal) {
            if previous.path() != path {
                Self::shut_down(previous);
            }
        }
        Ok(result)
    }

    /// Close a log that is no longer in use, keeping the store running
    fn shut_down(mut wal: WalWriter) {
        let path = wal.path().to_path_buf();
        let closed = match wal.append(&LogEntry::marker(Operation::Shutdown)) {
            Ok(()) => wal.close(),
            Err(e) => Err(e),
        };
        if let Err(e) = closed {
            tracing::warn!("Failed to close previous log {}: {}", path.display(), e);
        }
    }

    /// Write a SHUTDOWN marker and close the log
    ///
    /// Logging is off afterwards; calling this again is a no-op.
    pub fn close(&self) -> Result<()> {
        let mut guard = self.inner.write();
        if let Some(mut wal) = guard.wal.take() {
            wal.append(&LogEntry::marker(Operation::Shutdown))?;
            wal.close()?;
            tracing::info!("Queue log closed");
        }
        Ok(())
    }

    pub fn sync_strategy(&self) -> WalSyncStrategy {
        self.sync_strategy
    }
}

impl Default for QueueStore {
    fn default() -> Self {
        Self::new()
    }
}
