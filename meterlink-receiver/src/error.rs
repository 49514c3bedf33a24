use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReceiverError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("core error: {0}")]
    Core(#[from] meterlink_core::CoreError),

    #[error("timestamp {0} is outside the supported calendar range")]
    TimestampOutOfRange(f64),

    #[error("couldn't create a process lock at {lock_file}; process already running?")]
    AlreadyRunning { lock_file: PathBuf },

    #[error("failed to bind receive socket on {addr}: {source}")]
    Socket {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ReceiverError {
    ReceiverError::Io {
        path: path.into(),
        source,
    }
}
