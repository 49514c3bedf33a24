//! Error types for meterlink-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading configuration or managing the process lock.
#[derive(Debug, Error)]
pub enum CoreError {
    /// I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file did not exist at the expected path.
    #[error("configuration file {path} does not exist")]
    ConfigNotFound { path: PathBuf },

    /// YAML parse error on load, including missing required keys.
    #[error("failed to parse configuration at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The file parsed but its values are unusable.
    #[error("invalid configuration in {path}: {reason}")]
    InvalidConfig { path: PathBuf, reason: String },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

/// Reasons a datagram is not a well-formed frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("datagram is not valid UTF-8")]
    NotUtf8,

    #[error("expected 3 tab-separated fields, found {0}")]
    FieldCount(usize),

    #[error("timestamp {0:?} is not a finite number of seconds")]
    Timestamp(String),

    #[error("{field} must not contain tabs or line breaks")]
    Delimiter { field: &'static str },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CoreError {
    CoreError::Io {
        path: path.into(),
        source,
    }
}
