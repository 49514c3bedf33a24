//! Typed daemon configuration, loaded once at startup.
//!
//! # Layout
//!
//! ```text
//! ~/etc/
//!   broadcast.yaml   (sender: name, watched sources, lock file)
//!   recvmsg.yaml     (receiver: lock file, logging targets)
//! ```
//!
//! Every loader has the `_at(home, …)` form: relative paths in the file are
//! resolved against `home` (or against the broadcaster's base `path`), so
//! tests can point it at a `TempDir`. Missing keys surface as
//! [`CoreError::ConfigParse`]; unusable values as [`CoreError::InvalidConfig`].
//! Both are fatal to the daemon.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::codec::FIELD_SEPARATOR;
use crate::error::{io_err, CoreError};
use crate::paths::{
    default_address_dir, resolve_at, DEFAULT_BIND_ADDRESS, DEFAULT_BROADCAST_ADDRESS,
    DEFAULT_PORT,
};
use crate::types::{PartitionScheme, SenderName};

// ---------------------------------------------------------------------------
// 1. Broadcaster
// ---------------------------------------------------------------------------

/// One measurement source watched by the broadcaster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    /// Relative to [`BroadcastConfig::path`] unless absolute.
    pub file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastConfig {
    pub name: SenderName,
    /// Base directory for sources and the lock file. Relative to home.
    pub path: PathBuf,
    pub lock_file: PathBuf,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_broadcast_address")]
    pub broadcast_address: Ipv4Addr,
    pub sources: Vec<SourceConfig>,
}

impl BroadcastConfig {
    pub fn load_at(home: &Path, config_path: &Path) -> Result<Self, CoreError> {
        let mut config: Self = read_yaml(config_path)?;
        config.resolve(home);
        config.validate(config_path)?;
        Ok(config)
    }

    /// Watched files, in payload order.
    pub fn source_paths(&self) -> Vec<PathBuf> {
        self.sources.iter().map(|s| s.file.clone()).collect()
    }

    pub fn destination(&self) -> SocketAddr {
        SocketAddr::from((self.broadcast_address, self.port))
    }

    fn resolve(&mut self, home: &Path) {
        self.path = resolve_at(home, &self.path);
        self.lock_file = resolve_at(&self.path, &self.lock_file);
        for source in &mut self.sources {
            source.file = resolve_at(&self.path, &source.file);
        }
    }

    fn validate(&self, config_path: &Path) -> Result<(), CoreError> {
        check_name(config_path, "name", self.name.as_str())?;
        if self.sources.is_empty() {
            return Err(invalid(config_path, "`sources` must list at least one file"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// 2. Receiver
// ---------------------------------------------------------------------------

/// Where and how frames from one sender are logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub local_name: String,
    /// Matched exactly against the frame's sender name.
    pub remote_name: SenderName,
    /// Column header written after `Timestamp` in new partition files.
    pub header: String,
    /// Relative to home unless absolute.
    pub data_path: PathBuf,
    pub file_extension: String,
    #[serde(default)]
    pub partition: PartitionScheme,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverConfig {
    /// Relative to home unless absolute.
    pub lock_file: PathBuf,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,
    #[serde(default = "default_address_dir")]
    pub address_dir: PathBuf,
    pub targets: Vec<TargetConfig>,
}

impl ReceiverConfig {
    pub fn load_at(home: &Path, config_path: &Path) -> Result<Self, CoreError> {
        let mut config: Self = read_yaml(config_path)?;
        config.resolve(home);
        config.validate(config_path)?;
        Ok(config)
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    pub fn target_for(&self, sender: &SenderName) -> Option<&TargetConfig> {
        find_target(&self.targets, sender)
    }

    fn resolve(&mut self, home: &Path) {
        self.lock_file = resolve_at(home, &self.lock_file);
        self.address_dir = resolve_at(home, &self.address_dir);
        for target in &mut self.targets {
            target.data_path = resolve_at(home, &target.data_path);
        }
    }

    fn validate(&self, config_path: &Path) -> Result<(), CoreError> {
        if self.targets.is_empty() {
            return Err(invalid(config_path, "`targets` must list at least one target"));
        }
        let mut seen = HashSet::new();
        for target in &self.targets {
            check_name(config_path, "local_name", &target.local_name)?;
            check_name(config_path, "remote_name", target.remote_name.as_str())?;
            if target.file_extension.is_empty() {
                return Err(invalid(
                    config_path,
                    format!("target '{}' has an empty file_extension", target.local_name),
                ));
            }
            if !seen.insert(target.remote_name.as_str()) {
                return Err(invalid(
                    config_path,
                    format!("remote_name '{}' is configured twice", target.remote_name),
                ));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// 3. Helpers
// ---------------------------------------------------------------------------

/// Exact, case-sensitive match of `sender` against each target's `remote_name`.
pub fn find_target<'a>(
    targets: &'a [TargetConfig],
    sender: &SenderName,
) -> Option<&'a TargetConfig> {
    targets.iter().find(|t| &t.remote_name == sender)
}

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, CoreError> {
    if !path.is_file() {
        return Err(CoreError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_yaml::from_str(&contents).map_err(|source| CoreError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

fn check_name(config_path: &Path, key: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(invalid(config_path, format!("`{key}` must not be empty")));
    }
    if value.contains(|c: char| c == FIELD_SEPARATOR || c.is_control()) {
        return Err(invalid(
            config_path,
            format!("`{key}` must not contain tabs or control characters"),
        ));
    }
    Ok(())
}

fn invalid(config_path: &Path, reason: impl Into<String>) -> CoreError {
    CoreError::InvalidConfig {
        path: config_path.to_path_buf(),
        reason: reason.into(),
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_broadcast_address() -> Ipv4Addr {
    DEFAULT_BROADCAST_ADDRESS
}

fn default_bind_address() -> IpAddr {
    DEFAULT_BIND_ADDRESS
}
