//! External program handoff for file transfers.
//!
//! The session suspends itself, hands the device and console to a helper
//! program (sz/rz and friends), and resumes once the helper exits. The child
//! gets the device wired to its standard streams in blocking mode and a
//! cooked console; the parent waits, then re-arms raw mode.

use crate::domain::error::{SerComError, SerComResult};
use crate::infrastructure::console::Console;
use nix::libc;
use nix::sys::signal::{signal, sigprocmask, SigHandler, SigSet, SigmaskHow, Signal};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{execvp, fork, ForkResult};
use std::ffi::CString;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd};
use tracing::debug;

/// Exit code reported when the helper could not be executed at all.
pub const ABNORMAL_EXIT: i32 = 128;

/// How the helper program ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    Exited(i32),
    Signaled(Signal),
}

/// Run a transfer helper with exclusive, blocking access to the device.
///
/// SIGTERM stays blocked in the parent across the fork so a termination
/// request cannot race the ownership handover; the child re-establishes
/// default handling before exec.
pub fn run_transfer<D: AsFd>(
    device: &D,
    console: &mut Console,
    command: &str,
    filename: Option<&str>,
) -> SerComResult<TransferOutcome> {
    let argv = build_argv(command, filename)?;

    let mut block = SigSet::empty();
    block.add(Signal::SIGTERM);
    let mut old_mask = SigSet::empty();
    sigprocmask(SigmaskHow::SIG_BLOCK, Some(&block), Some(&mut old_mask))
        .map_err(|e| SerComError::term("sigprocmask", e))?;

    match unsafe { fork() } {
        Err(e) => {
            let _ = sigprocmask(SigmaskHow::SIG_SETMASK, Some(&old_mask), None);
            Err(SerComError::Handoff {
                message: format!("cannot fork: {}", e),
            })
        }
        Ok(ForkResult::Child) => child_exec(device.as_fd(), console, &old_mask, &argv),
        Ok(ForkResult::Parent { child }) => {
            let _ = sigprocmask(SigmaskHow::SIG_SETMASK, Some(&old_mask), None);
            let status = waitpid(child, None);
            // The helper owned the console; take it back before reporting.
            console.reapply_raw()?;
            match status {
                Ok(WaitStatus::Exited(_, code)) => {
                    debug!(code, "transfer helper exited");
                    Ok(TransferOutcome::Exited(code))
                }
                Ok(WaitStatus::Signaled(_, sig, _)) => Ok(TransferOutcome::Signaled(sig)),
                Ok(other) => Err(SerComError::Handoff {
                    message: format!("unexpected helper status: {:?}", other),
                }),
                Err(e) => Err(SerComError::Handoff {
                    message: format!("waitpid failed: {}", e),
                }),
            }
        }
    }
}

/// Child side: everything here is best effort and must never unwind back
/// into the forked copy of the session.
fn child_exec(
    device: BorrowedFd<'_>,
    console: &Console,
    old_mask: &SigSet,
    argv: &[CString],
) -> ! {
    unsafe {
        let _ = signal(Signal::SIGINT, SigHandler::SigDfl);
        let _ = signal(Signal::SIGTERM, SigHandler::SigDfl);
    }
    let _ = sigprocmask(SigmaskHow::SIG_SETMASK, Some(old_mask), None);

    // The helper expects a cooked console and a blocking device on its
    // standard streams.
    let _ = console.restore();
    let fd = device.as_raw_fd();
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags >= 0 {
            libc::fcntl(fd, libc::F_SETFL, flags & !libc::O_NONBLOCK);
        }
        libc::dup2(fd, libc::STDIN_FILENO);
        libc::dup2(fd, libc::STDOUT_FILENO);
    }

    let shown: Vec<String> = argv
        .iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    eprintln!("{}", shown.join(" "));

    let _ = execvp(&argv[0], argv);
    unsafe { libc::_exit(ABNORMAL_EXIT) }
}

/// Split a command template on whitespace and append the filename, if any.
fn build_argv(command: &str, filename: Option<&str>) -> SerComResult<Vec<CString>> {
    let mut parts: Vec<&str> = command.split_whitespace().collect();
    if let Some(name) = filename {
        parts.push(name);
    }
    if parts.is_empty() {
        return Err(SerComError::Handoff {
            message: "empty transfer command".to_string(),
        });
    }
    parts
        .into_iter()
        .map(|p| {
            CString::new(p).map_err(|_| SerComError::Handoff {
                message: "transfer command contains a NUL byte".to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv_strings(command: &str, filename: Option<&str>) -> Vec<String> {
        build_argv(command, filename)
            .unwrap()
            .into_iter()
            .map(|c| c.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_build_argv_splits_template() {
        assert_eq!(
            argv_strings("ascii_xfr -s -v -l10", None),
            vec!["ascii_xfr", "-s", "-v", "-l10"]
        );
    }

    #[test]
    fn test_build_argv_appends_filename() {
        assert_eq!(
            argv_strings("sz -vv", Some("firmware.bin")),
            vec!["sz", "-vv", "firmware.bin"]
        );
    }

    #[test]
    fn test_build_argv_rejects_empty_command() {
        assert!(build_argv("   ", None).is_err());
    }

    #[test]
    fn test_build_argv_rejects_nul() {
        assert!(build_argv("rz -vv", Some("bad\0name")).is_err());
    }
}
