//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::Result;
use super::LogEntry;

/// Reads entries from the WAL file in file order
///
/// Lines that do not decode are skipped and counted, never returned. A
/// final line without a trailing `\n` is a partial write: it is never
/// decoded and its length is reported by [`WalReader::torn_tail_bytes`].
pub struct WalReader {
    reader: BufReader<File>,

    /// Reused line buffer
    buf: Vec<u8>,

    /// 1-based number of the last line read
    line_number: u64,

    /// Lines skipped as malformed
    lines_skipped: u64,

    /// Byte length of the file up to the end of the last complete line
    valid_len: u64,

    /// Bytes after the last `\n`, once end of file has been reached
    torn_tail_bytes: u64,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            buf: Vec::new(),
            line_number: 0,
            lines_skipped: 0,
            valid_len: 0,
            torn_tail_bytes: 0,
        })
    }

    /// Read the next well-formed entry from the WAL
    ///
    /// Returns `Ok(None)` at end of file.
    pub fn next_entry(&mut self) -> Result<Option<LogEntry>> {
        loop {
            self.buf.clear();
            let read = self.reader.read_until(b'\n', &mut self.buf)?;
            if read == 0 {
                return Ok(None);
            }
            if self.buf.last() != Some(&b'\n') {
                // Only the last line can lack a newline
                self.torn_tail_bytes = read as u64;
                tracing::debug!(
                    "Ignoring {} bytes of partial write after line {}",
                    read,
                    self.line_number
                );
                return Ok(None);
            }
            self.line_number += 1;
            self.valid_len += read as u64;

            let decoded = std::str::from_utf8(&self.buf)
                .map_err(|e| e.to_string())
                .and_then(|line| LogEntry::decode(line).map_err(|e| e.to_string()));

            match decoded {
                Ok(entry) => return Ok(Some(entry)),
                Err(reason) => {
                    tracing::debug!("Skipping WAL line {}: {}", self.line_number, reason);
                    self.lines_skipped += 1;
                }
            }
        }
    }

    /// Iterate over all well-formed entries
    pub fn entries(self) -> WalIterator {
        WalIterator { reader: self }
    }

    /// Number of the line most recently read
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// Lines skipped so far
    pub fn lines_skipped(&self) -> u64 {
        self.lines_skipped
    }

    /// Offset just past the last complete line read so far
    pub fn valid_len(&self) -> u64 {
        self.valid_len
    }

    /// Length of the unterminated final line (0 if the file ends in `\n`)
    pub fn torn_tail_bytes(&self) -> u64 {
        self.torn_tail_bytes
    }
}

/// Iterator over WAL entries
pub struct WalIterator {
    reader: WalReader,
}

impl Iterator for WalIterator {
    type Item = Result<LogEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next_entry().transpose()
    }
}
