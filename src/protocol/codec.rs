//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! Every request and every response is one `\n`-terminated line. A
//! trailing `\r` is tolerated on input.
//!
//! ### Requests
//! ```text
//! PUBLISH <message>
//! CONSUME
//! SIZE
//! ```
//!
//! ### Responses
//! ```text
//! ACK                 (PUBLISH)
//! <message> | EMPTY   (CONSUME)
//! SIZE <n>            (SIZE)
//! ERROR: <reason>     (anything that failed)
//! ```
//!
//! A CONSUME response is the raw message, so a client can only tell a
//! message apart from `EMPTY` or `ERROR: ...` by convention.

use std::io::{BufRead, Write};

use crate::error::{HawkError, Result};
use super::{Command, Response};

/// Prefix of a PUBLISH request; the message is the rest of the line
pub const PUBLISH_PREFIX: &str = "PUBLISH ";

/// Prefix of an ERROR response
pub const ERROR_PREFIX: &str = "ERROR: ";

/// Reason sent back for input that is not a command
pub const UNKNOWN_COMMAND: &str = "unknown command";

/// Reason sent back for a request line that is not valid UTF-8
pub const INVALID_UTF8: &str = "invalid UTF-8 in request";

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to a line (without the newline)
pub fn encode_command(command: &Command) -> String {
    match command {
        Command::Publish { message } => format!("{}{}", PUBLISH_PREFIX, message),
        Command::Consume | Command::Size => command.keyword().to_string(),
    }
}

/// Decode a command from a line
pub fn decode_command(line: &str) -> Result<Command> {
    let line = trim_line_ending(line);

    if let Some(message) = line.strip_prefix(PUBLISH_PREFIX) {
        return Ok(Command::Publish {
            message: message.to_string(),
        });
    }

    match line {
        "CONSUME" => Ok(Command::Consume),
        "SIZE" => Ok(Command::Size),
        _ => Err(HawkError::Protocol(UNKNOWN_COMMAND.to_string())),
    }
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to a line (without the newline)
pub fn encode_response(response: &Response) -> String {
    match response {
        Response::Ack => "ACK".to_string(),
        Response::Message(message) => message.clone(),
        Response::Empty => "EMPTY".to_string(),
        Response::Size(n) => format!("SIZE {}", n),
        Response::Error(reason) => format!("{}{}", ERROR_PREFIX, reason),
    }
}

/// Decode the response to `command`
///
/// Responses are not self-describing, so the command that was sent
/// decides how the line is read.
pub fn decode_response(command: &Command, line: &str) -> Result<Response> {
    let line = trim_line_ending(line);

    if let Some(reason) = line.strip_prefix(ERROR_PREFIX) {
        return Ok(Response::Error(reason.to_string()));
    }

    match command {
        Command::Publish { .. } => match line {
            "ACK" => Ok(Response::Ack),
            other => Err(HawkError::Protocol(format!(
                "expected ACK, got {:?}",
                other
            ))),
        },
        Command::Consume => match line {
            "EMPTY" => Ok(Response::Empty),
            message => Ok(Response::Message(message.to_string())),
        },
        Command::Size => {
            let count = line
                .strip_prefix("SIZE ")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| {
                    HawkError::Protocol(format!("expected SIZE <n>, got {:?}", line))
                })?;
            Ok(Response::Size(count))
        }
    }
}

fn trim_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one line from a stream, without its line ending
///
/// Returns `Ok(None)` once the peer has closed the stream. A line that is
/// not valid UTF-8 is consumed and rejected with `HawkError::Protocol`, so
/// the stream stays positioned at the next line.
pub fn read_line<R: BufRead>(reader: &mut R) -> Result<Option<String>> {
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf)? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8(buf)
        .map_err(|_| HawkError::Protocol(INVALID_UTF8.to_string()))?;
    Ok(Some(trim_line_ending(&line).to_string()))
}

/// Write one line and flush
pub fn write_line<W: Write>(writer: &mut W, line: &str) -> Result<()> {
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    write_line(writer, &encode_command(command))
}

/// Read the response to `command` from a stream
pub fn read_response<R: BufRead>(reader: &mut R, command: &Command) -> Result<Response> {
    match read_line(reader)? {
        Some(line) => decode_response(command, &line),
        None => Err(HawkError::Network(
            "connection closed before a response was received".to_string(),
        )),
    }
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    write_line(writer, &encode_response(response))
}
