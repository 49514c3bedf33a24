//! Last-known source address per sender, for outside diagnostics.
//!
//! One plain-text file per sender (`<dir>/<sender>.addr`) holding the IP the
//! most recent frame came from. Never consulted when filtering frames.

use std::fs;
use std::io::ErrorKind;
use std::net::IpAddr;
use std::path::Path;

use meterlink_core::paths::address_record_path;
use meterlink_core::SenderName;

use crate::error::{io_err, ReceiverError};

/// Recorded address text for `sender`, trimmed. `None` if nothing recorded.
pub fn read_address(dir: &Path, sender: &SenderName) -> Result<Option<String>, ReceiverError> {
    let path = address_record_path(dir, sender.as_str());
    match fs::read_to_string(&path) {
        Ok(contents) => Ok(contents.lines().next().map(|l| l.trim().to_string())),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(&path, err)),
    }
}

/// Store `addr` for `sender` unless it is already the recorded value.
/// Returns `true` if the file was (re)written.
pub fn record_address(
    dir: &Path,
    sender: &SenderName,
    addr: IpAddr,
) -> Result<bool, ReceiverError> {
    let current = addr.to_string();
    if read_address(dir, sender)?.as_deref() == Some(current.as_str()) {
        return Ok(false);
    }
    let path = address_record_path(dir, sender.as_str());
    fs::write(&path, &current).map_err(|e| io_err(&path, e))?;
    tracing::debug!(sender = %sender, addr = %current, "sender address recorded");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use tempfile::TempDir;

    #[test]
    fn first_sighting_creates_record() {
        let dir = TempDir::new().unwrap();
        let sender = SenderName::from("METER1");

        assert_eq!(read_address(dir.path(), &sender).unwrap(), None);
        let written =
            record_address(dir.path(), &sender, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7))).unwrap();
        assert!(written);
        assert_eq!(
            fs::read_to_string(dir.path().join("METER1.addr")).unwrap(),
            "10.0.0.7"
        );
    }

    #[test]
    fn same_address_is_not_rewritten_and_new_one_overwrites() {
        let dir = TempDir::new().unwrap();
        let sender = SenderName::from("METER1");
        let first = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7));
        let moved = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 9));

        record_address(dir.path(), &sender, first).unwrap();
        assert!(!record_address(dir.path(), &sender, first).unwrap());
        assert!(record_address(dir.path(), &sender, moved).unwrap());
        assert_eq!(
            read_address(dir.path(), &sender).unwrap().as_deref(),
            Some("10.0.0.9")
        );
    }
}
