//! HDB UUCP advisory device locks.
//!
//! Best effort: when the lock directory does not exist, locking is silently
//! disabled rather than blocking operation. A lock held by a process that no
//! longer exists is treated as stale and removed.

use crate::domain::error::{SerComError, SerComResult};
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const LOCK_DIR: &str = "/var/lock";

/// An acquired (or intentionally absent) advisory lock on a device path.
/// Released when dropped.
#[derive(Debug)]
pub struct UucpLock {
    lockfile: Option<PathBuf>,
}

impl UucpLock {
    pub fn acquire(device: &Path) -> SerComResult<Self> {
        Self::acquire_in(Path::new(LOCK_DIR), device)
    }

    fn acquire_in(lock_dir: &Path, device: &Path) -> SerComResult<Self> {
        if !lock_dir.is_dir() {
            debug!(dir = %lock_dir.display(), "lock directory missing, locking disabled");
            return Ok(Self { lockfile: None });
        }

        let lockfile = lock_dir.join(lock_name(device));
        if let Ok(contents) = fs::read_to_string(&lockfile) {
            match contents.trim().parse::<i32>() {
                Ok(pid) if pid > 0 && kill(Pid::from_raw(pid), None) == Err(Errno::ESRCH) => {
                    info!(pid, lock = %lockfile.display(), "removing stale lock");
                    let _ = fs::remove_file(&lockfile);
                }
                Ok(pid) => {
                    return Err(SerComError::Locked {
                        message: format!(
                            "{} is in use by process {}",
                            device.display(),
                            pid
                        ),
                    });
                }
                Err(_) => {
                    return Err(SerComError::Locked {
                        message: format!("{} holds an unreadable lock", lockfile.display()),
                    });
                }
            }
        }

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lockfile)
            .map_err(|e| SerComError::Locked {
                message: format!("cannot create {}: {}", lockfile.display(), e),
            })?;
        writeln!(file, "{:04}", std::process::id()).map_err(|e| SerComError::Locked {
            message: format!("cannot write {}: {}", lockfile.display(), e),
        })?;
        debug!(lock = %lockfile.display(), "device lock acquired");

        Ok(Self {
            lockfile: Some(lockfile),
        })
    }
}

impl Drop for UucpLock {
    fn drop(&mut self) {
        if let Some(path) = self.lockfile.take() {
            let _ = fs::remove_file(path);
        }
    }
}

/// Lock file name for a device: strip the leading path component, then
/// flatten any remaining separators. `/dev/serial/by-id/x` -> `LCK..serial_by-id_x`.
fn lock_name(device: &Path) -> String {
    let full = device.to_string_lossy();
    let tail = full
        .char_indices()
        .skip(1)
        .find(|&(_, c)| c == '/')
        .map(|(i, _)| &full[i + 1..])
        .unwrap_or(&full);
    format!("LCK..{}", tail.replace('/', "_"))
}
