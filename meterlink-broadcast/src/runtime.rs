use std::fs::File;
use std::io::{BufRead, BufReader};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::net::UdpSocket;

use meterlink_core::codec::{FIELD_SEPARATOR, MISSING_READING};
use meterlink_core::{
    spawn_signal_listener, BroadcastConfig, Frame, FrameError, ProcessLock, RunFlag, SenderName,
    Timestamp,
};

use crate::error::BroadcastError;
use crate::watcher::{ChangeWatcher, POLL_INTERVAL};

/// UDP gives no delivery guarantee; every frame goes out this many times.
pub const SEND_REPEATS: usize = 3;
pub const SEND_SPACING: Duration = Duration::from_millis(100);

/// Run the broadcaster in the foreground until SIGINT/SIGTERM.
///
/// Takes the process lock first; a live owner is a fatal startup error.
pub fn start_blocking(config: BroadcastConfig) -> Result<(), BroadcastError> {
    let Some(lock) = ProcessLock::acquire(&config.lock_file)? else {
        return Err(BroadcastError::AlreadyRunning {
            lock_file: config.lock_file.clone(),
        });
    };
    tracing::info!(
        lock_file = %lock.path().display(),
        pid = lock.owner().pid,
        "process lock acquired",
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(BroadcastError::Runtime)?;

    let result = runtime.block_on(async {
        let flag = RunFlag::new();
        let signals = spawn_signal_listener(flag.clone());
        let mut broadcaster = Broadcaster::bind(&config).await?;
        broadcaster.run(&flag).await;
        signals.abort();
        Ok::<(), BroadcastError>(())
    });

    lock.release()?;
    tracing::info!("broadcaster done.");
    result
}

pub struct Broadcaster {
    sender: SenderName,
    watcher: ChangeWatcher,
    socket: UdpSocket,
    destination: SocketAddr,
}

impl Broadcaster {
    pub async fn bind(config: &BroadcastConfig) -> Result<Self, BroadcastError> {
        Self::with_destination(
            config.name.clone(),
            config.source_paths(),
            config.destination(),
        )
        .await
    }

    /// Open an ephemeral broadcast-capable socket aimed at `destination`.
    pub async fn with_destination(
        sender: SenderName,
        sources: Vec<PathBuf>,
        destination: SocketAddr,
    ) -> Result<Self, BroadcastError> {
        let local = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0));
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|source| BroadcastError::Socket {
                addr: local,
                source,
            })?;
        socket
            .set_broadcast(true)
            .map_err(|source| BroadcastError::Socket {
                addr: local,
                source,
            })?;

        Ok(Self {
            sender,
            watcher: ChangeWatcher::new(sources),
            socket,
            destination,
        })
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    /// Poll for changes once a second; on change build one frame and send it.
    /// Returns at the first poll boundary after `flag` is cleared.
    pub async fn run(&mut self, flag: &RunFlag) {
        tracing::info!(
            sender = %self.sender,
            destination = %self.destination,
            sources = self.watcher.files().len(),
            "broadcaster started",
        );

        while flag.is_running() {
            if !self.watcher.poll() {
                tokio::time::sleep(POLL_INTERVAL).await;
                continue;
            }
            if !flag.is_running() {
                break;
            }

            match self.current_frame() {
                Ok(frame) => {
                    self.send_frame(&frame).await;
                }
                Err(err) => tracing::warn!(error = %err, "could not build frame"),
            }
        }

        tracing::info!("broadcaster stopping");
    }

    pub fn current_frame(&self) -> Result<Frame, FrameError> {
        let paths: Vec<&Path> = self.watcher.paths().collect();
        build_frame(&self.sender, &paths, Timestamp::now())
    }

    /// Send `frame` [`SEND_REPEATS`] times, [`SEND_SPACING`] apart.
    /// Returns how many sends succeeded; failures are logged, never retried.
    pub async fn send_frame(&self, frame: &Frame) -> usize {
        let bytes = frame.encode();
        let mut sent = 0;
        for attempt in 1..=SEND_REPEATS {
            match self.socket.send_to(bytes.as_bytes(), self.destination).await {
                Ok(_) => sent += 1,
                Err(err) => tracing::warn!(
                    attempt,
                    destination = %self.destination,
                    error = %err,
                    "broadcast send failed",
                ),
            }
            tokio::time::sleep(SEND_SPACING).await;
        }
        tracing::debug!(frame = %bytes, sent, "frame broadcast");
        sent
    }
}

/// Build the frame for the current contents of `sources`, in order.
pub fn build_frame(
    sender: &SenderName,
    sources: &[&Path],
    timestamp: Timestamp,
) -> Result<Frame, FrameError> {
    let readings: Vec<String> = sources.iter().map(|path| read_reading(path)).collect();
    Frame::from_readings(timestamp, sender.clone(), &readings)
}

/// Trimmed first line of `path`, or [`MISSING_READING`] if the file is
/// absent, empty, unreadable, or holds a value the frame cannot carry.
///
/// A blank first line also yields [`MISSING_READING`], never an empty value,
/// so every slot in the payload is either a reading or the sentinel.
pub fn read_reading(path: &Path) -> String {
    let readable = std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false);
    if !readable {
        tracing::debug!(path = %path.display(), "source missing or empty");
        return MISSING_READING.to_string();
    }

    let mut line = String::new();
    let read = File::open(path).and_then(|file| BufReader::new(file).read_line(&mut line));
    if let Err(err) = read {
        tracing::warn!(path = %path.display(), error = %err, "failed to read source");
        return MISSING_READING.to_string();
    }

    let value = line.trim();
    if value.is_empty() {
        return MISSING_READING.to_string();
    }
    if value.contains(FIELD_SEPARATOR) {
        tracing::warn!(path = %path.display(), "reading contains a tab; sending sentinel");
        return MISSING_READING.to_string();
    }
    value.to_string()
}
