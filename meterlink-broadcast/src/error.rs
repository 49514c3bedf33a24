use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Startup failures. Nothing inside the broadcast loop is fatal.
#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("core error: {0}")]
    Core(#[from] meterlink_core::CoreError),

    #[error("couldn't create a process lock at {lock_file}; process already running?")]
    AlreadyRunning { lock_file: PathBuf },

    #[error("failed to open broadcast socket on {addr}: {source}")]
    Socket {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}
