//! Queue Module
//!
//! In-memory FIFO of messages, optionally backed by the WAL.
//!
//! ## Responsibilities
//! - Preserve insertion order exactly
//! - Log every mutation while logging is enabled, under the same lock
//! - Rebuild contents from the log on startup
//!
//! ## Data Structure Choice
//! `VecDeque<String>` behind a `parking_lot::RwLock`: O(1) at both ends,
//! and writers already serialize on the log file so a lock-free queue
//! buys nothing.

mod store;

pub use store::QueueStore;

use crate::error::{HawkError, Result};

/// Result of a queue mutation that has already been applied in memory
///
/// `wal_error` is set when the matching log append failed. The mutation
/// is not rolled back, so the log is behind memory until a later append
/// succeeds.
#[must_use]
#[derive(Debug)]
pub struct Outcome<T> {
    value: T,
    wal_error: Option<HawkError>,
}

impl<T> Outcome<T> {
    pub(crate) fn new(value: T, wal_error: Option<HawkError>) -> Self {
        Self { value, wal_error }
    }

    /// The applied result
    pub fn value(&self) -> &T {
        &self.value
    }

    /// The log failure, if any
    pub fn wal_error(&self) -> Option<&HawkError> {
        self.wal_error.as_ref()
    }

    pub fn into_parts(self) -> (T, Option<HawkError>) {
        (self.value, self.wal_error)
    }

    /// Treat a log failure as an error, dropping the applied value
    pub fn into_result(self) -> Result<T> {
        match self.wal_error {
            Some(e) => Err(e),
            None => Ok(self.value),
        }
    }

    /// Take the value, logging any WAL failure as a warning
    pub fn into_value(self) -> T {
        if let Some(e) = &self.wal_error {
            tracing::warn!("Queue mutation applied but not logged: {}", e);
        }
        self.value
    }
}
