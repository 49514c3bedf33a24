//! meterlink core library: wire frame, typed configuration, process lock.
//!
//! Shared by the broadcaster and receiver daemons:
//! - [`codec`]: [`Frame`] encode / decode
//! - [`config`]: [`BroadcastConfig`] / [`ReceiverConfig`] loading and validation
//! - [`lock`]: [`ProcessLock`] PID-file singleton guard
//! - [`shutdown`]: [`RunFlag`] and signal wiring
//! - [`types`]: newtypes and enums
//! - [`error`]: [`CoreError`], [`FrameError`]

pub mod codec;
pub mod config;
pub mod error;
pub mod lock;
pub mod paths;
pub mod shutdown;
pub mod types;

pub use codec::Frame;
pub use config::{BroadcastConfig, ReceiverConfig, SourceConfig, TargetConfig};
pub use error::{CoreError, FrameError};
pub use lock::{LockOwner, ProcessLock};
pub use shutdown::{init_tracing, spawn_signal_listener, RunFlag};
pub use types::{PartitionScheme, SenderName, Timestamp};
