//! # HawkMQ
//!
//! A minimal durable message queue with:
//! - FIFO delivery of opaque text messages
//! - An optional write-ahead log (WAL) for durability
//! - Crash recovery by replaying the log
//! - A line-oriented TCP protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │              (one thread per connection)                     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  PUBLISH / CONSUME / SIZE
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Broker                                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    QueueStore                                │
//! │        ┌──────────────┐      ┌──────────────┐                │
//! │        │  VecDeque    │      │     WAL      │                │
//! │        │  (messages)  │      │  (append)    │                │
//! │        └──────────────┘      └──────────────┘                │
//! │              one RwLock guards both                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod wal;
pub mod queue;
pub mod network;
pub mod protocol;
pub mod broker;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{HawkError, Result};
pub use config::{Config, WalSyncStrategy};
pub use broker::Broker;
pub use queue::{Outcome, QueueStore};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of HawkMQ
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
