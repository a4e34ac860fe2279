//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries and their
//! one-line text encoding.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

use crate::error::{HawkError, Result};

/// Separator between the fields of a log line
pub const DELIMITER: char = ' ';

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// The operation that was applied
    pub operation: Operation,

    /// When the entry was created (UTC, whole seconds)
    pub timestamp: DateTime<Utc>,

    /// Message content; empty for STARTUP/SHUTDOWN markers
    pub payload: String,
}

/// Operations that can be logged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Process began writing to this log
    Startup,

    /// A message was appended to the tail
    Enqueue,

    /// The head message was removed
    Dequeue,

    /// The log was closed cleanly
    Shutdown,
}

impl Operation {
    /// The keyword written to disk
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Startup => "STARTUP",
            Operation::Enqueue => "ENQUEUE",
            Operation::Dequeue => "DEQUEUE",
            Operation::Shutdown => "SHUTDOWN",
        }
    }

    /// Markers carry no payload and never mutate the queue
    pub fn is_marker(&self) -> bool {
        matches!(self, Operation::Startup | Operation::Shutdown)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = HawkError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "STARTUP" => Ok(Operation::Startup),
            "ENQUEUE" => Ok(Operation::Enqueue),
            "DEQUEUE" => Ok(Operation::Dequeue),
            "SHUTDOWN" => Ok(Operation::Shutdown),
            other => Err(HawkError::MalformedEntry(format!(
                "unknown operation {:?}",
                other
            ))),
        }
    }
}

impl LogEntry {
    /// Create an entry stamped with the current time
    pub fn new(operation: Operation, payload: impl Into<String>) -> Self {
        Self::with_timestamp(operation, Utc::now().trunc_subsecs(0), payload)
    }

    /// Create a STARTUP/SHUTDOWN marker stamped with the current time
    pub fn marker(operation: Operation) -> Self {
        Self::new(operation, String::new())
    }

    /// Create an entry with an explicit timestamp
    pub fn with_timestamp(
        operation: Operation,
        timestamp: DateTime<Utc>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            timestamp,
            payload: payload.into(),
        }
    }

    /// Encode to a single line (without the trailing newline)
    ///
    /// Format: `OPERATION TIMESTAMP PAYLOAD`. The delimiter after the
    /// timestamp is always written, so markers end in a space and still
    /// carry three fields.
    pub fn encode(&self) -> Result<String> {
        if self.payload.contains('\n') {
            return Err(HawkError::WalWrite(format!(
                "{} payload contains a newline and cannot be logged",
                self.operation
            )));
        }

        let timestamp = self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut line = String::with_capacity(
            self.operation.as_str().len() + timestamp.len() + self.payload.len() + 2,
        );
        line.push_str(self.operation.as_str());
        line.push(DELIMITER);
        line.push_str(&timestamp);
        line.push(DELIMITER);
        line.push_str(&self.payload);
        Ok(line)
    }

    /// Decode one line
    ///
    /// Splits on the first two delimiters only; everything after the
    /// second one is payload, delimiters included.
    pub fn decode(line: &str) -> Result<Self> {
        let line = line.strip_suffix('\n').unwrap_or(line);

        let mut fields = line.splitn(3, DELIMITER);
        let (operation, timestamp, payload) = match (fields.next(), fields.next(), fields.next()) {
            (Some(op), Some(ts), Some(payload)) => (op, ts, payload),
            _ => {
                return Err(HawkError::MalformedEntry(format!(
                    "expected 3 fields in {:?}",
                    line
                )))
            }
        };

        let operation = operation.parse::<Operation>()?;
        let timestamp = DateTime::parse_from_rfc3339(timestamp)
            .map_err(|e| HawkError::MalformedEntry(format!("bad timestamp {:?}: {}", timestamp, e)))?
            .with_timezone(&Utc);

        Ok(Self {
            operation,
            timestamp,
            payload: payload.to_string(),
        })
    }
}
