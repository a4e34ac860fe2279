//! TCP Server
//!
//! Accepts connections and hands each one to its own thread.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

use crate::broker::Broker;
use crate::config::Config;
use crate::error::{HawkError, Result};
use crate::protocol::{write_response, Response};
use super::Connection;

/// How long the accept loop waits for a shutdown signal between polls
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// TCP server for HawkMQ
pub struct Server {
    config: Config,
    broker: Arc<Broker>,
    listener: TcpListener,
    local_addr: SocketAddr,

    shutdown_tx: Sender<()>,
    shutdown_rx: Receiver<()>,

    /// Connections currently being served
    active: Arc<AtomicUsize>,
}

/// Cloneable handle that stops a running [`Server`]
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Sender<()>,
}

impl ShutdownHandle {
    /// Signal the server to stop accepting connections
    pub fn shutdown(&self) {
        // A full channel means a shutdown is already pending
        let _ = self.tx.try_send(());
    }
}

impl Server {
    /// Bind the listen address from `config`
    pub fn bind(config: Config, broker: Arc<Broker>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            HawkError::Network(format!("failed to listen on {}: {}", config.listen_addr, e))
        })?;
        let local_addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = channel::bounded(1);

        Ok(Self {
            config,
            broker,
            listener,
            local_addr,
            shutdown_tx,
            shutdown_rx,
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle for stopping the server from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown_handle().shutdown();
    }

    /// Connections currently being served
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Run the accept loop (blocking) until shutdown is signalled
    ///
    /// Connection threads that are still running when this returns are
    /// left to finish on their own.
    pub fn run(&self) -> Result<()> {
        self.listener.set_nonblocking(true)?;
        tracing::info!("HawkMQ server listening on {}", self.local_addr);

        loop {
            if self.shutdown_rx.try_recv().is_ok() {
                break;
            }

            match self.listener.accept() {
                Ok((stream, peer)) => self.dispatch(stream, peer),
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    match self.shutdown_rx.recv_timeout(ACCEPT_POLL_INTERVAL) {
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {}
                    }
                }
                Err(e) => {
                    tracing::warn!("Error accepting connection: {}", e);
                }
            }
        }

        tracing::info!("Accept loop stopped");
        Ok(())
    }

    fn dispatch(&self, stream: TcpStream, peer: SocketAddr) {
        if let Err(e) = stream.set_nonblocking(false) {
            tracing::warn!("Dropping connection from {}: {}", peer, e);
            return;
        }

        let Some(slot) = ConnectionSlot::acquire(&self.active, self.config.max_connections)
        else {
            tracing::warn!(
                "Rejecting {}: {} connections already open",
                peer,
                self.config.max_connections
            );
            reject(stream);
            return;
        };

        let broker = Arc::clone(&self.broker);
        let (read_ms, write_ms) = (self.config.read_timeout_ms, self.config.write_timeout_ms);

        let spawned = thread::Builder::new()
            .name(format!("hawkmq-conn-{}", peer))
            .spawn(move || {
                let _slot = slot;
                let mut connection = match Connection::new(stream, broker) {
                    Ok(c) => c,
                    Err(e) => {
                        tracing::warn!("Failed to set up connection from {}: {}", peer, e);
                        return;
                    }
                };
                if let Err(e) = connection.set_timeouts(read_ms, write_ms) {
                    tracing::warn!("Failed to set timeouts for {}: {}", peer, e);
                }
                if let Err(e) = connection.handle() {
                    tracing::debug!("Connection {} closed with error: {}", peer, e);
                }
            });

        if let Err(e) = spawned {
            tracing::error!("Failed to spawn connection thread for {}: {}", peer, e);
        }
    }
}

/// Counts one open connection; released on drop
struct ConnectionSlot {
    active: Arc<AtomicUsize>,
}

impl ConnectionSlot {
    fn acquire(active: &Arc<AtomicUsize>, limit: usize) -> Option<Self> {
        let previous = active.fetch_add(1, Ordering::SeqCst);
        if previous >= limit {
            active.fetch_sub(1, Ordering::SeqCst);
            return None;
        }
        Some(Self {
            active: Arc::clone(active),
        })
    }
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

fn reject(mut stream: TcpStream) {
    let _ = write_response(&mut stream, &Response::error("too many connections"));
}
