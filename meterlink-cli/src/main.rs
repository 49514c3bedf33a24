//! meterlink: broadcast meter readings over UDP and log them on receipt.
//!
//! # Usage
//!
//! ```text
//! meterlink broadcast [--config <file>] [--debug]
//! meterlink receive [--config <file>] [--debug]
//! meterlink status broadcast|receive [--config <file>]
//! meterlink addr <sender> [--config <file>]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    addr::AddrArgs, broadcast::BroadcastArgs, receive::ReceiveArgs, status::StatusArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "meterlink",
    version,
    about = "Broadcast measurement readings on the local network and log them on receipt",
    long_about = None,
)]
struct Cli {
    /// Turn debugging output on (overrides RUST_LOG).
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watch source files and broadcast a frame whenever one changes.
    Broadcast(BroadcastArgs),

    /// Listen for frames and append them to partitioned log files.
    Receive(ReceiveArgs),

    /// Report whether a daemon's lock file names a live process.
    Status(StatusArgs),

    /// Show the last source address the receiver recorded for a sender.
    Addr(AddrArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    meterlink_core::init_tracing(cli.debug);
    match cli.command {
        Commands::Broadcast(args) => args.run(),
        Commands::Receive(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Addr(args) => args.run(),
    }
}
