//! Broker Module
//!
//! Owns the queue and wires it to the protocol.
//!
//! ## Responsibilities
//! - Create the data directory and bring the WAL up on startup
//! - Recover from an existing log, or start a fresh one
//! - Route protocol commands to queue operations
//! - Close the log on shutdown

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::config::Config;
use crate::error::{HawkError, Result};
use crate::protocol::{Command, Response};
use crate::queue::QueueStore;
use crate::wal::RecoveryResult;

/// Reason given to clients once the broker is closed
pub const CLOSED: &str = "queue is closed";

/// The process-wide message broker
///
/// Built once by the server binary and shared with every connection
/// through an `Arc`.
pub struct Broker {
    config: Config,

    queue: QueueStore,

    /// Cleared by `close`; publish and consume are refused afterwards
    accepting: RwLock<bool>,

    /// Stats from the startup replay, if one happened
    recovery: Option<RecoveryResult>,
}

impl Broker {
    /// Open a broker with the given config
    ///
    /// With persistence enabled:
    /// 1. Create the data directory
    /// 2. Replay the log if it exists, otherwise start a fresh one
    /// 3. Ready to serve requests
    pub fn open(config: Config) -> Result<Self> {
        let queue = QueueStore::with_sync_strategy(config.wal_sync_strategy);
        let mut recovery = None;

        if config.persistence {
            fs::create_dir_all(&config.data_dir).map_err(|e| {
                HawkError::Config(format!(
                    "cannot create data directory {}: {}",
                    config.data_dir.display(),
                    e
                ))
            })?;

            let log_path = config.log_path();
            if log_path.exists() {
                let result = queue.recover_from_log(&log_path)?;
                if !result.clean_shutdown && result.entries_replayed > 0 {
                    tracing::warn!("Previous run did not shut down cleanly");
                }
                recovery = Some(result);
            } else {
                queue.enable_logging(&log_path)?;
            }
            tracing::info!("Queue operations will be logged to {}", log_path.display());
        }

        Ok(Self {
            config,
            queue,
            accepting: RwLock::new(true),
            recovery,
        })
    }

    /// Open an in-memory broker (no WAL)
    pub fn in_memory() -> Self {
        Self {
            config: Config::default(),
            queue: QueueStore::new(),
            accepting: RwLock::new(true),
            recovery: None,
        }
    }

    /// Execute a command
    ///
    /// A failed log append is logged and the client still gets the normal
    /// answer, since the operation has been applied. Once the broker is
    /// closed, PUBLISH and CONSUME get an error and leave the queue alone;
    /// SIZE still answers.
    pub fn execute(&self, command: Command) -> Response {
        match command {
            Command::Publish { message } => {
                let accepting = self.accepting.read();
                if !*accepting {
                    return Response::error(CLOSED);
                }
                self.queue.enqueue(message).into_value();
                Response::Ack
            }
            Command::Consume => {
                let accepting = self.accepting.read();
                if !*accepting {
                    return Response::error(CLOSED);
                }
                Response::consumed(self.queue.dequeue().into_value())
            }
            Command::Size => Response::Size(self.queue.size()),
        }
    }

    /// Close the broker gracefully
    ///
    /// Waits for in-flight publishes and consumes, stops accepting new
    /// ones, then writes the SHUTDOWN marker and syncs the log. Nothing
    /// can reach the queue after the marker.
    pub fn close(&self) -> Result<()> {
        let mut accepting = self.accepting.write();
        *accepting = false;
        self.queue.close()
    }

    /// Whether the broker still accepts publish and consume
    pub fn is_open(&self) -> bool {
        *self.accepting.read()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn queue(&self) -> &QueueStore {
        &self.queue
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Path of the log, if persistence is enabled
    pub fn log_path(&self) -> Option<PathBuf> {
        self.config.persistence.then(|| self.config.log_path())
    }

    pub fn recovery(&self) -> Option<&RecoveryResult> {
        self.recovery.as_ref()
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }
}
