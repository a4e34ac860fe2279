//! HawkMQ Server Binary
//!
//! Starts the TCP server for HawkMQ.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use crossbeam::channel;
use hawkmq::network::Server;
use hawkmq::{Broker, Config, WalSyncStrategy};
use tracing_subscriber::{fmt, EnvFilter};

/// HawkMQ Server
#[derive(Parser, Debug)]
#[command(name = "hawkmq-server")]
#[command(about = "Minimal durable FIFO message queue")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// Port to listen on, replacing the port in --listen
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable queue operation logging
    #[arg(long)]
    log: bool,

    /// fsync the log every N entries instead of after every write
    #[arg(long, value_name = "N")]
    sync_every: Option<usize>,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hawkmq=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    let listen = match args.port {
        Some(port) => with_port(&args.listen, port),
        None => args.listen.clone(),
    };
    let sync_strategy = match args.sync_every {
        Some(count) if count > 1 => WalSyncStrategy::EveryNEntries { count },
        _ => WalSyncStrategy::EveryWrite,
    };

    tracing::info!("HawkMQ Server v{}", hawkmq::VERSION);
    tracing::info!("Listen address: {}", listen);
    if args.log {
        tracing::info!("Data directory: {}", args.data_dir);
        tracing::info!("WAL sync strategy: {:?}", sync_strategy);
    }

    // Build config from args
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .persistence(args.log)
        .wal_sync_strategy(sync_strategy)
        .listen_addr(listen)
        .max_connections(args.max_connections)
        .build();
    let shutdown_timeout = Duration::from_millis(config.shutdown_timeout_ms);

    // Open broker
    let broker = match Broker::open(config.clone()) {
        Ok(b) => Arc::new(b),
        Err(e) => {
            tracing::error!("Failed to open broker: {}", e);
            std::process::exit(1);
        }
    };

    let server = match Server::bind(config, Arc::clone(&broker)) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    // Set up Ctrl+C / SIGTERM handler
    let (signal_tx, signal_rx) = channel::bounded(1);
    let handle = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Shutting down...");
        handle.shutdown();
        let _ = signal_tx.try_send(());
    }) {
        tracing::warn!("Failed to install signal handler: {}", e);
    }
    tracing::info!("Press Ctrl+C to shutdown");

    // Run the accept loop on its own thread so shutdown can be bounded
    let (done_tx, done_rx) = channel::bounded(1);
    let spawned = thread::Builder::new()
        .name("hawkmq-accept".to_string())
        .spawn(move || {
            let _ = done_tx.send(server.run());
        });
    if let Err(e) = spawned {
        tracing::error!("Failed to start accept loop: {}", e);
        std::process::exit(1);
    }

    let mut exit_code = 0;
    channel::select! {
        recv(done_rx) -> result => {
            if let Ok(Err(e)) = result {
                tracing::error!("Server error: {}", e);
                exit_code = 1;
            }
        }
        recv(signal_rx) -> _ => {
            match done_rx.recv_timeout(shutdown_timeout) {
                Ok(Err(e)) => tracing::error!("Server error: {}", e),
                Ok(Ok(())) => {}
                Err(_) => tracing::warn!("Forced shutdown after timeout"),
            }
        }
    }

    // Connections still being served get "ERROR: queue is closed" from here on
    if let Err(e) = broker.close() {
        tracing::error!("Error closing queue: {}", e);
        exit_code = 1;
    }

    tracing::info!("Server stopped");
    std::process::exit(exit_code);
}

/// Replace the port of a `host:port` address
fn with_port(listen: &str, port: u16) -> String {
    let host = listen
        .rsplit_once(':')
        .map(|(host, _)| host)
        .unwrap_or(listen);
    format!("{}:{}", host, port)
}
