//! WAL Recovery
//!
//! Rebuilds the queue contents by replaying the WAL.

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::path::Path;

use crate::error::{HawkError, Result};
use super::{Operation, WalReader};

/// Handles WAL replay after a restart or crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Well-formed entries applied, markers included
    pub entries_replayed: u64,

    /// ENQUEUE entries applied
    pub enqueued: u64,

    /// DEQUEUE entries applied
    pub dequeued: u64,

    /// STARTUP/SHUTDOWN markers seen
    pub markers: u64,

    /// Malformed lines skipped
    pub lines_skipped: u64,

    /// Messages in the queue after replay
    pub messages: usize,

    /// Whether the last well-formed entry is a SHUTDOWN marker
    pub clean_shutdown: bool,

    /// Bytes of an unterminated final line (a partial write), not replayed
    pub torn_tail_bytes: u64,

    /// Whether that partial write was cut off the file
    pub was_truncated: bool,

    /// File length up to the end of the last complete line
    pub valid_len: u64,
}

impl WalRecovery {
    /// Replay a WAL file into a fresh message sequence
    ///
    /// This will:
    /// 1. Read every line in file order
    /// 2. Skip lines that do not decode
    /// 3. Push ENQUEUE payloads onto the tail
    /// 4. Pop the head for each DEQUEUE, which must match the logged payload
    ///
    /// A DEQUEUE that does not match the current head (or arrives when the
    /// sequence is empty) means the log is not a FIFO history and is
    /// reported as corruption. A final line without a newline is a write
    /// that never completed; it is ignored and reported in
    /// `torn_tail_bytes`. The file is not modified.
    pub fn replay(path: &Path) -> Result<(VecDeque<String>, RecoveryResult)> {
        let mut reader = WalReader::open(path)?;
        let mut messages = VecDeque::new();
        let mut result = RecoveryResult::default();

        while let Some(entry) = reader.next_entry()? {
            match entry.operation {
                Operation::Enqueue => {
                    messages.push_back(entry.payload);
                    result.enqueued += 1;
                }
                Operation::Dequeue => {
                    let head = messages.pop_front().ok_or_else(|| {
                        HawkError::WalCorruption(format!(
                            "line {}: DEQUEUE of {:?} from an empty queue",
                            reader.line_number(),
                            entry.payload
                        ))
                    })?;
                    if head != entry.payload {
                        return Err(HawkError::WalCorruption(format!(
                            "line {}: DEQUEUE of {:?} but queue head is {:?}",
                            reader.line_number(),
                            entry.payload,
                            head
                        )));
                    }
                    result.dequeued += 1;
                }
                Operation::Startup | Operation::Shutdown => {
                    result.markers += 1;
                }
            }
            result.entries_replayed += 1;
            result.clean_shutdown = entry.operation == Operation::Shutdown;
        }

        result.lines_skipped = reader.lines_skipped();
        result.torn_tail_bytes = reader.torn_tail_bytes();
        result.valid_len = reader.valid_len();
        result.messages = messages.len();
        Ok((messages, result))
    }

    /// Replay a WAL file and cut off any partial write at its end
    ///
    /// After this returns the file ends on a complete line, so appending
    /// to it cannot extend a torn entry.
    pub fn recover(path: &Path) -> Result<(VecDeque<String>, RecoveryResult)> {
        let (messages, mut result) = Self::replay(path)?;

        if result.torn_tail_bytes > 0 {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(result.valid_len)?;
            file.sync_all()?;
            result.was_truncated = true;
            tracing::warn!(
                "Truncated {} bytes of partial write from {}",
                result.torn_tail_bytes,
                path.display()
            );
        }

        Ok((messages, result))
    }

    /// Check a WAL file without building any queue state or modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        Self::replay(path).map(|(_, result)| result)
    }
}
