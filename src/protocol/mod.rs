//! Protocol Module
//!
//! Defines the line-oriented text protocol for client-server communication.
//!
//! ### Commands
//! - `PUBLISH <message>` - enqueue, answered with `ACK`
//! - `CONSUME`           - dequeue, answered with the message or `EMPTY`
//! - `SIZE`              - answered with `SIZE <n>`
//!
//! Anything else is answered with `ERROR: unknown command`, and a line that
//! is not UTF-8 with `ERROR: invalid UTF-8 in request`. Each command is
//! a single queue operation; there are no multi-command transactions.

mod command;
mod response;
mod codec;

pub use command::Command;
pub use response::Response;
pub use codec::{
    decode_command, decode_response, encode_command, encode_response, read_line,
    read_response, write_command, write_line, write_response, ERROR_PREFIX, INVALID_UTF8,
    PUBLISH_PREFIX, UNKNOWN_COMMAND,
};
