//! Receiver daemon: decode broadcast frames and log them into partition files.

pub mod address;
mod error;
pub mod log_rotation;
pub mod runtime;

pub use error::ReceiverError;
pub use log_rotation::{append, partition_key, partition_key_in, AppendOutcome};
pub use runtime::{start_blocking, Disposition, FrameProcessor, Receiver};
