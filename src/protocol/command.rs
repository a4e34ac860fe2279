//! Command definitions
//!
//! Represents commands from clients.

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Append a message to the queue
    Publish { message: String },

    /// Take the oldest message
    Consume,

    /// Report the number of queued messages
    Size,
}

impl Command {
    /// The command keyword as sent on the wire
    pub fn keyword(&self) -> &'static str {
        match self {
            Command::Publish { .. } => "PUBLISH",
            Command::Consume => "CONSUME",
            Command::Size => "SIZE",
        }
    }
}
