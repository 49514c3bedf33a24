use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tokio::net::UdpSocket;

use meterlink_core::config::find_target;
use meterlink_core::{
    spawn_signal_listener, Frame, ProcessLock, ReceiverConfig, RunFlag, TargetConfig,
};

use crate::error::ReceiverError;
use crate::{address, log_rotation};

/// Upper bound on one wait for a datagram; the run flag is checked between waits.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);
pub const MAX_DATAGRAM: usize = 65_507;

/// What the receiver did with one datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Logged { path: PathBuf },
    Malformed,
    Duplicate,
    UnknownSender,
    MissingDataDir { path: PathBuf },
    WriteFailed,
}

/// Run the receiver in the foreground until SIGINT/SIGTERM.
pub fn start_blocking(config: ReceiverConfig) -> Result<(), ReceiverError> {
    let Some(lock) = ProcessLock::acquire(&config.lock_file)? else {
        return Err(ReceiverError::AlreadyRunning {
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
        .map_err(ReceiverError::Runtime)?;

    let result = runtime.block_on(async {
        let flag = RunFlag::new();
        let signals = spawn_signal_listener(flag.clone());
        let mut receiver = Receiver::bind(&config).await?;
        receiver.run(&flag).await;
        signals.abort();
        Ok::<(), ReceiverError>(())
    });

    lock.release()?;
    tracing::info!("receiver done.");
    result
}

/// Decode → deduplicate → resolve target → append → record address.
///
/// Duplicate suppression remembers only the last accepted timestamp text.
/// It exists to absorb the broadcaster's repeated sends; two different
/// senders that happen to stamp identical timestamps back to back will lose
/// the second frame.
#[derive(Debug)]
pub struct FrameProcessor {
    targets: Vec<TargetConfig>,
    address_dir: PathBuf,
    last_timestamp: Option<String>,
}

impl FrameProcessor {
    pub fn new(targets: Vec<TargetConfig>, address_dir: PathBuf) -> Self {
        Self {
            targets,
            address_dir,
            last_timestamp: None,
        }
    }

    pub fn from_config(config: &ReceiverConfig) -> Self {
        Self::new(config.targets.clone(), config.address_dir.clone())
    }

    pub fn handle_datagram(&mut self, bytes: &[u8], source: SocketAddr) -> Disposition {
        let Ok(frame) = Frame::decode_bytes(bytes) else {
            return Disposition::Malformed;
        };
        tracing::debug!(
            addr = %source,
            timestamp = %frame.timestamp(),
            sender = %frame.sender(),
            payload = frame.payload(),
            "frame received",
        );

        if self.last_timestamp.as_deref() == Some(frame.timestamp().as_str()) {
            tracing::debug!(timestamp = %frame.timestamp(), "duplicate timestamp, dropped");
            return Disposition::Duplicate;
        }
        self.last_timestamp = Some(frame.timestamp().as_str().to_string());

        let Some(target) = find_target(&self.targets, frame.sender()) else {
            tracing::warn!(
                sender = %frame.sender(),
                "no target configured for sender; local and remote names must match",
            );
            return Disposition::UnknownSender;
        };

        let disposition = log_frame(target, &frame);

        if let Err(err) = address::record_address(&self.address_dir, frame.sender(), source.ip()) {
            tracing::warn!(sender = %frame.sender(), error = %err, "failed to record sender address");
        }
        disposition
    }
}

fn log_frame(target: &TargetConfig, frame: &Frame) -> Disposition {
    if !target.data_path.is_dir() {
        tracing::warn!(
            sender = %frame.sender(),
            local_name = %target.local_name,
            path = %target.data_path.display(),
            "data path does not exist",
        );
        return Disposition::MissingDataDir {
            path: target.data_path.clone(),
        };
    }

    match log_rotation::append(target, frame.timestamp().seconds(), frame.payload()) {
        Ok(outcome) => {
            tracing::debug!(
                local_name = %target.local_name,
                path = %outcome.path.display(),
                "record appended",
            );
            Disposition::Logged { path: outcome.path }
        }
        Err(err) => {
            tracing::warn!(local_name = %target.local_name, error = %err, "failed to append record");
            Disposition::WriteFailed
        }
    }
}

pub struct Receiver {
    socket: UdpSocket,
    processor: FrameProcessor,
}

impl Receiver {
    pub async fn bind(config: &ReceiverConfig) -> Result<Self, ReceiverError> {
        Self::bind_addr(config.bind_addr(), FrameProcessor::from_config(config)).await
    }

    pub async fn bind_addr(addr: SocketAddr, processor: FrameProcessor) -> Result<Self, ReceiverError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| ReceiverError::Socket { addr, source })?;
        Ok(Self { socket, processor })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ReceiverError> {
        self.socket
            .local_addr()
            .map_err(|source| ReceiverError::Io {
                path: PathBuf::from("receive socket"),
                source,
            })
    }

    /// Wait at most [`POLL_INTERVAL`] for each datagram, handle it, repeat.
    /// Returns at the first boundary after `flag` is cleared.
    pub async fn run(&mut self, flag: &RunFlag) {
        if let Ok(addr) = self.local_addr() {
            tracing::info!(addr = %addr, "receiver listening");
        }

        let mut buf = vec![0u8; MAX_DATAGRAM];
        while flag.is_running() {
            match tokio::time::timeout(POLL_INTERVAL, self.socket.recv_from(&mut buf)).await {
                Ok(Ok((len, source))) => {
                    self.processor.handle_datagram(&buf[..len], source);
                }
                Ok(Err(err)) => {
                    tracing::warn!(error = %err, "receive failed");
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
                Err(_) => {}
            }
        }

        tracing::info!("receiver stopping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::net::{IpAddr, Ipv4Addr};

    use meterlink_core::{PartitionScheme, SenderName};
    use tempfile::TempDir;

    fn source() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)), 40000)
    }

    fn processor(home: &TempDir) -> FrameProcessor {
        let data = home.path().join("data");
        fs::create_dir_all(&data).unwrap();
        let addrs = home.path().join("addr");
        fs::create_dir_all(&addrs).unwrap();
        FrameProcessor::new(
            vec![TargetConfig {
                local_name: "gasmeter".to_string(),
                remote_name: SenderName::from("METER1"),
                header: "Volume".to_string(),
                data_path: data,
                file_extension: "dat".to_string(),
                partition: PartitionScheme::ModifiedJulianDay,
            }],
            addrs,
        )
    }

    fn file_count(dir: &std::path::Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn malformed_datagrams_are_dropped_without_state_change() {
        let home = TempDir::new().unwrap();
        let mut processor = processor(&home);

        let cases: [&[u8]; 4] = [b"garbage", b"1\tMETER1", b"x\tMETER1\t1", &[0xff, 0x00]];
        for bytes in cases {
            assert_eq!(processor.handle_datagram(bytes, source()), Disposition::Malformed);
        }
        assert_eq!(processor.last_timestamp, None);
        assert_eq!(file_count(&home.path().join("data")), 0);
    }

    #[test]
    fn repeated_timestamp_is_logged_once() {
        let home = TempDir::new().unwrap();
        let mut processor = processor(&home);
        let datagram = b"86400.0\tMETER1\t12.34";

        let first = processor.handle_datagram(datagram, source());
        assert_eq!(
            first,
            Disposition::Logged {
                path: home.path().join("data/40588.dat")
            }
        );
        assert_eq!(processor.handle_datagram(datagram, source()), Disposition::Duplicate);
        assert_eq!(processor.handle_datagram(datagram, source()), Disposition::Duplicate);

        let contents = fs::read_to_string(home.path().join("data/40588.dat")).unwrap();
        assert_eq!(contents, "Timestamp\tVolume\n40588.000000\t12.34\n");
    }

    #[test]
    fn duplicate_check_compares_only_previous_timestamp() {
        let home = TempDir::new().unwrap();
        let mut processor = processor(&home);

        processor.handle_datagram(b"100\tMETER1\t1", source());
        processor.handle_datagram(b"200\tMETER1\t2", source());
        let again = processor.handle_datagram(b"100\tMETER1\t3", source());
        assert!(matches!(again, Disposition::Logged { .. }));
    }

    #[test]
    fn unknown_sender_writes_nothing() {
        let home = TempDir::new().unwrap();
        let mut processor = processor(&home);

        let outcome = processor.handle_datagram(b"86400\tSTRANGER\t1", source());
        assert_eq!(outcome, Disposition::UnknownSender);
        assert_eq!(file_count(&home.path().join("data")), 0);
        assert_eq!(file_count(&home.path().join("addr")), 0);

        // The loop carries on with the next frame.
        let next = processor.handle_datagram(b"86401\tMETER1\t2", source());
        assert!(matches!(next, Disposition::Logged { .. }));
    }

    #[test]
    fn missing_data_dir_is_reported_and_not_created() {
        let home = TempDir::new().unwrap();
        let mut processor = processor(&home);
        fs::remove_dir(home.path().join("data")).unwrap();

        let outcome = processor.handle_datagram(b"86400\tMETER1\t1", source());
        assert_eq!(
            outcome,
            Disposition::MissingDataDir {
                path: home.path().join("data")
            }
        );
        assert!(!home.path().join("data").exists());
    }

    #[test]
    fn sender_address_is_recorded_for_matched_frames() {
        let home = TempDir::new().unwrap();
        let mut processor = processor(&home);

        processor.handle_datagram(b"86400\tMETER1\t1", source());
        assert_eq!(
            fs::read_to_string(home.path().join("addr/METER1.addr")).unwrap(),
            "192.168.1.20"
        );

        let moved = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 21)), 40000);
        processor.handle_datagram(b"86401\tMETER1\t2", moved);
        assert_eq!(
            fs::read_to_string(home.path().join("addr/METER1.addr")).unwrap(),
            "192.168.1.21"
        );
    }

    #[test]
    fn trailing_newline_from_line_oriented_senders_is_accepted() {
        let home = TempDir::new().unwrap();
        let mut processor = processor(&home);

        let outcome = processor.handle_datagram(b"86400.5\tMETER1\t12.34\n", source());
        assert_eq!(
            outcome,
            Disposition::Logged {
                path: home.path().join("data/40588.dat")
            }
        );
        let contents = fs::read_to_string(home.path().join("data/40588.dat")).unwrap();
        assert!(contents.ends_with("\t12.34\n"));
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn unrepresentable_timestamp_is_a_write_failure_not_a_crash() {
        let home = TempDir::new().unwrap();
        let mut processor = processor(&home);

        let outcome = processor.handle_datagram(b"1e300\tMETER1\t1", source());
        assert_eq!(outcome, Disposition::WriteFailed);
        assert_eq!(file_count(&home.path().join("data")), 0);

        let next = processor.handle_datagram(b"86400\tMETER1\t2", source());
        assert!(matches!(next, Disposition::Logged { .. }));
    }
}
