use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use crate::error::CoreError;

/// Well-known UDP port shared by broadcasters and receivers.
pub const DEFAULT_PORT: u16 = 12345;
pub const DEFAULT_BROADCAST_ADDRESS: Ipv4Addr = Ipv4Addr::BROADCAST;
pub const DEFAULT_BIND_ADDRESS: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

pub const BROADCAST_CONFIG: &str = "broadcast.yaml";
pub const RECEIVER_CONFIG: &str = "recvmsg.yaml";
pub const ADDRESS_RECORD_EXTENSION: &str = "addr";

/// The invoking user's home directory; relative config paths hang off it.
pub fn home_dir() -> Result<PathBuf, CoreError> {
    dirs::home_dir().ok_or(CoreError::HomeNotFound)
}

pub fn config_dir(home: &Path) -> PathBuf {
    home.join("etc")
}

pub fn default_broadcast_config(home: &Path) -> PathBuf {
    config_dir(home).join(BROADCAST_CONFIG)
}

pub fn default_receiver_config(home: &Path) -> PathBuf {
    config_dir(home).join(RECEIVER_CONFIG)
}

/// Sender address records live outside the log tree.
pub fn default_address_dir() -> PathBuf {
    std::env::temp_dir()
}

/// `<dir>/<sender>.addr`
pub fn address_record_path(dir: &Path, sender: &str) -> PathBuf {
    dir.join(format!("{sender}.{ADDRESS_RECORD_EXTENSION}"))
}

/// Absolute paths pass through; relative ones are taken from `base`.
pub fn resolve_at(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_resolve_against_base() {
        let home = Path::new("/home/pi");
        assert_eq!(
            resolve_at(home, Path::new("data/gas")),
            PathBuf::from("/home/pi/data/gas")
        );
        assert_eq!(
            resolve_at(home, Path::new("/srv/gas")),
            PathBuf::from("/srv/gas")
        );
    }

    #[test]
    fn address_record_is_named_after_sender() {
        assert_eq!(
            address_record_path(Path::new("/tmp"), "METER1"),
            PathBuf::from("/tmp/METER1.addr")
        );
    }
}
