//! Response definitions
//!
//! Represents responses to clients.

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// PUBLISH accepted
    Ack,

    /// CONSUME returned a message
    Message(String),

    /// CONSUME found the queue empty
    Empty,

    /// Answer to SIZE
    Size(usize),

    /// The request could not be served
    Error(String),
}

impl Response {
    /// Create an ERROR response
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error(message.into())
    }

    /// Response to a CONSUME
    pub fn consumed(message: Option<String>) -> Self {
        match message {
            Some(message) => Response::Message(message),
            None => Response::Empty,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }
}
