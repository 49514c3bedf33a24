//! Change-triggered broadcaster: watch source files, send a frame on change.

mod error;
pub mod runtime;
pub mod watcher;

pub use error::BroadcastError;
pub use runtime::{build_frame, read_reading, start_blocking, Broadcaster};
pub use watcher::ChangeWatcher;
