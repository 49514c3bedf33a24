//! PID-bearing lock file that keeps one live daemon per host.
//!
//! The file holds a single line, `"<program> <pid>"`, with no trailing
//! newline. A lock is *live* only while the recorded PID is still running;
//! a crash leaves the file behind and the next [`ProcessLock::acquire`]
//! reclaims it after probing the process table. File existence alone never
//! blocks a new instance.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{io_err, CoreError};

/// Program and PID recorded in a lock file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockOwner {
    pub program: String,
    pub pid: u32,
}

impl LockOwner {
    /// Parses `"<program> <pid>"`. Anything else yields `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let (Some(program), Some(pid), None) = (fields.next(), fields.next(), fields.next())
        else {
            return None;
        };
        Some(Self {
            program: program.to_string(),
            pid: pid.parse().ok()?,
        })
    }

    pub fn is_alive(&self) -> bool {
        is_process_alive(self.pid)
    }
}

/// A held lock. Dropping it removes the lock file.
#[derive(Debug)]
pub struct ProcessLock {
    path: PathBuf,
    owner: LockOwner,
    released: bool,
}

impl ProcessLock {
    /// Take the lock at `path` for the current process.
    ///
    /// Returns `Ok(None)` when a live process already holds it. A stale or
    /// unreadable lock file is overwritten.
    pub fn acquire(path: &Path) -> Result<Option<Self>, CoreError> {
        if let Some(owner) = live_owner(path)? {
            tracing::debug!(
                path = %path.display(),
                pid = owner.pid,
                program = %owner.program,
                "lock held by live process",
            );
            return Ok(None);
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
            }
        }

        let owner = LockOwner {
            program: program_name(),
            pid: std::process::id(),
        };
        fs::write(path, format!("{} {}", owner.program, owner.pid))
            .map_err(|e| io_err(path, e))?;

        Ok(Some(Self {
            path: path.to_path_buf(),
            owner,
            released: false,
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn owner(&self) -> &LockOwner {
        &self.owner
    }

    /// Remove the lock file now instead of on drop.
    pub fn release(mut self) -> Result<(), CoreError> {
        self.released = true;
        release(&self.path)
    }
}

impl Drop for ProcessLock {
    fn drop(&mut self) {
        if !self.released {
            let _ = release(&self.path);
        }
    }
}

/// Delete the lock file at `path` if present, whoever owns it.
pub fn release(path: &Path) -> Result<(), CoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(path, err)),
    }
}

/// Owner recorded in the lock file, alive or not.
pub fn read_owner(path: &Path) -> Result<Option<LockOwner>, CoreError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(contents.lines().next().and_then(LockOwner::parse)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(path, err)),
    }
}

/// Owner recorded in the lock file, only if that process is still running.
pub fn live_owner(path: &Path) -> Result<Option<LockOwner>, CoreError> {
    Ok(read_owner(path)?.filter(LockOwner::is_alive))
}

#[cfg(target_os = "linux")]
pub fn is_process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

#[cfg(not(target_os = "linux"))]
pub fn is_process_alive(pid: u32) -> bool {
    let mut system = sysinfo::System::new();
    system.refresh_process(sysinfo::Pid::from_u32(pid))
}

fn program_name() -> String {
    std::env::args_os()
        .next()
        .as_deref()
        .map(Path::new)
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "meterlink".to_string())
}
