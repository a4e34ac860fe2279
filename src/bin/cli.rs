//! HawkMQ CLI Client
//!
//! Command-line interface for interacting with HawkMQ.

use std::io::BufReader;
use std::net::TcpStream;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use hawkmq::protocol::{encode_response, read_response, write_command, Command};
use hawkmq::wal::WalRecovery;
use hawkmq::Result;

/// HawkMQ CLI
#[derive(Parser, Debug)]
#[command(name = "hawkmq-cli")]
#[command(about = "CLI for the HawkMQ message queue")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Publish a message
    Publish {
        /// The message to publish
        message: String,
    },

    /// Consume the oldest message
    Consume,

    /// Show the number of queued messages
    Size,

    /// Replay a queue log offline and print what it contains
    Verify {
        /// Path to the log file
        path: PathBuf,
    },
}

fn main() {
    let args = Args::parse();

    let outcome = match args.command {
        Commands::Publish { message } => send(&args.server, Command::Publish { message }),
        Commands::Consume => send(&args.server, Command::Consume),
        Commands::Size => send(&args.server, Command::Size),
        Commands::Verify { path } => verify(&path),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Send one command and print the response line
fn send(server: &str, command: Command) -> Result<()> {
    let mut stream = TcpStream::connect(server)?;
    write_command(&mut stream, &command)?;

    let mut reader = BufReader::new(stream);
    let response = read_response(&mut reader, &command)?;
    println!("Response: {}", encode_response(&response));
    Ok(())
}

fn verify(path: &Path) -> Result<()> {
    let result = WalRecovery::verify(path)?;
    println!("Entries replayed: {}", result.entries_replayed);
    println!("  enqueued:       {}", result.enqueued);
    println!("  dequeued:       {}", result.dequeued);
    println!("  markers:        {}", result.markers);
    println!("Lines skipped:    {}", result.lines_skipped);
    println!("Partial write:    {} bytes", result.torn_tail_bytes);
    println!("Messages queued:  {}", result.messages);
    println!("Clean shutdown:   {}", result.clean_shutdown);
    Ok(())
}
