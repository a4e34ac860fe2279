//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::broker::Broker;
use crate::error::{HawkError, Result};
use crate::protocol::{decode_command, read_line, write_response, Command, Response};

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Reference to the shared broker
    broker: Arc<Broker>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(stream: TcpStream, broker: Arc<Broker>) -> Result<Self> {
        // Get peer address for logging before we split the stream
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Responses are single short lines; don't let Nagle hold them back
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            broker,
            peer_addr,
        })
    }

    /// Configure connection timeouts (0 leaves a direction unbounded)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        let read_stream = self.reader.get_ref();
        let write_stream = self.writer.get_ref();

        if read_ms > 0 {
            read_stream.set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            write_stream.set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }

        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads one command per line and answers each before reading the next.
    /// A line that is not UTF-8 gets an error reply like any bad command.
    /// Returns when the client disconnects or an error occurs.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            let response = match read_line(&mut self.reader) {
                Ok(Some(line)) => self.respond_to(&line),
                Ok(None) => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Err(HawkError::Protocol(reason)) => {
                    tracing::debug!("Rejected input from {}: {}", self.peer_addr, reason);
                    Response::Error(reason)
                }
                Err(HawkError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!("Connection with {} ended: {}", self.peer_addr, e);
                    return Ok(());
                }
                Err(HawkError::Io(ref e))
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    // WouldBlock on Unix, TimedOut on Windows
                    tracing::debug!("Read timeout for client {}", self.peer_addr);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            };

            if let Err(e) = self.send_response(&response) {
                if let HawkError::Io(ref io_err) = e {
                    if is_disconnect(io_err.kind()) {
                        tracing::debug!(
                            "Client {} disconnected before response could be sent: {}",
                            self.peer_addr,
                            e
                        );
                        return Ok(());
                    }
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    /// Decode one request line and run it
    fn respond_to(&self, line: &str) -> Response {
        match decode_command(line) {
            Ok(command) => {
                tracing::trace!("Received command from {}: {:?}", self.peer_addr, command);
                self.execute_command(command)
            }
            Err(HawkError::Protocol(reason)) => {
                tracing::debug!("Rejected input from {}: {:?}", self.peer_addr, line);
                Response::Error(reason)
            }
            Err(e) => Response::error(e.to_string()),
        }
    }

    fn execute_command(&self, command: Command) -> Response {
        self.broker.execute(command)
    }

    fn send_response(&mut self, response: &Response) -> Result<()> {
        write_response(&mut self.writer, response)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
    )
}
