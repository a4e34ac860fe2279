//! Write-Ahead Log (WAL) Module
//!
//! Provides durability guarantees through append-only logging.
//!
//! ## Responsibilities
//! - Append one line per queue mutation before the caller is answered
//! - fsync according to the configured sync strategy
//! - Replay the log to rebuild the queue after a restart
//!
//! ## File Format
//! ```text
//! STARTUP 2024-05-01T10:00:00Z
//! ENQUEUE 2024-05-01T10:00:01Z hello world
//! DEQUEUE 2024-05-01T10:00:02Z hello world
//! SHUTDOWN 2024-05-01T10:00:03Z
//! ```
//! One entry per line, `OPERATION TIMESTAMP PAYLOAD`. No header, no
//! checksum. The payload is everything after the second space.

mod entry;
mod writer;
mod reader;
mod recovery;

pub use entry::{LogEntry, Operation, DELIMITER};
pub use writer::WalWriter;
pub use reader::{WalIterator, WalReader};
pub use recovery::{RecoveryResult, WalRecovery};
