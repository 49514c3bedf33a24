pub mod addr;
pub mod broadcast;
pub mod receive;
pub mod status;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use meterlink_core::paths::{self, resolve_at};

pub(crate) fn home_dir() -> Result<PathBuf> {
    paths::home_dir().context("could not determine home directory")
}

/// `--config` if given (relative to home), otherwise `default`.
pub(crate) fn config_path(home: &Path, explicit: Option<&Path>, default: PathBuf) -> PathBuf {
    match explicit {
        Some(path) => resolve_at(home, path),
        None => default,
    }
}
