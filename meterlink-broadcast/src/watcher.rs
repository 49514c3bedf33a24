//! Modification-time polling over a fixed, ordered list of source files.
//!
//! A file that is missing (or not a regular file) reports the Unix epoch as
//! its mtime. That value is tracked like any other, so a source vanishing or
//! reappearing counts as a change.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Sleep between polls while nothing has changed.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedFile {
    pub path: PathBuf,
    pub last_seen: SystemTime,
}

#[derive(Debug)]
pub struct ChangeWatcher {
    files: Vec<WatchedFile>,
    primed: bool,
}

impl ChangeWatcher {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let files = paths
            .into_iter()
            .map(|path| {
                let last_seen = modification_time(&path);
                WatchedFile { path, last_seen }
            })
            .collect();
        Self {
            files,
            primed: false,
        }
    }

    /// `true` if any mtime moved since the previous call. The first call
    /// always reports a change so the current readings go out at startup.
    pub fn poll(&mut self) -> bool {
        let mut changed = !self.primed;
        self.primed = true;

        for file in &mut self.files {
            let current = modification_time(&file.path);
            if current != file.last_seen {
                tracing::debug!(path = %file.path.display(), "source file changed");
                file.last_seen = current;
                changed = true;
            }
        }
        changed
    }

    pub fn files(&self) -> &[WatchedFile] {
        &self.files
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(|f| f.path.as_path())
    }
}

pub fn modification_time(path: &Path) -> SystemTime {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => meta.modified().unwrap_or(UNIX_EPOCH),
        _ => UNIX_EPOCH,
    }
}
