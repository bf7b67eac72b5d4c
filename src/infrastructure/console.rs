//! The user-facing console endpoint.
//!
//! Construction puts stdin into raw mode; the original settings come back on
//! every exit path via `Drop`. The transfer handoff temporarily returns the
//! console to cooked mode while a helper program owns it.

use crate::domain::error::{SerComError, SerComResult};
use nix::libc;
use nix::sys::termios::{cfmakeraw, tcgetattr, tcsetattr, SetArg, SpecialCharacterIndices, Termios};
use std::io::{Read, Write};
use std::os::fd::{AsRawFd, BorrowedFd};

/// Unbuffered reader over the console input stream.
///
/// Byte reads must go straight to the descriptor: buffered readers pull
/// ahead of the readiness poll and strand bytes outside it.
pub struct ConsoleIn;

/// Unbuffered writer over the console output stream.
pub struct ConsoleOut;

impl Read for ConsoleIn {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        nix::unistd::read(Console::input_fd().as_raw_fd(), buf)
            .map_err(|e| std::io::Error::from_raw_os_error(e as i32))
    }
}

impl Write for ConsoleOut {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        nix::unistd::write(Console::output_fd(), buf)
            .map_err(|e| std::io::Error::from_raw_os_error(e as i32))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Raw-mode console owning both standard streams for the session's lifetime.
pub struct Console {
    original: Termios,
}

impl Console {
    pub fn new() -> SerComResult<Self> {
        let original =
            tcgetattr(Self::input_fd()).map_err(|e| SerComError::term("tcgetattr", e))?;
        let console = Self { original };
        console.reapply_raw()?;
        Ok(console)
    }

    pub fn input_fd() -> BorrowedFd<'static> {
        unsafe { BorrowedFd::borrow_raw(libc::STDIN_FILENO) }
    }

    pub fn output_fd() -> BorrowedFd<'static> {
        unsafe { BorrowedFd::borrow_raw(libc::STDOUT_FILENO) }
    }

    /// Put the console (back) into raw byte-at-a-time mode.
    pub fn reapply_raw(&self) -> SerComResult<()> {
        let mut raw = self.original.clone();
        cfmakeraw(&mut raw);
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
        tcsetattr(Self::input_fd(), SetArg::TCSANOW, &raw)
            .map_err(|e| SerComError::term("tcsetattr", e))
    }

    /// Restore the original cooked mode.
    pub fn restore(&self) -> SerComResult<()> {
        tcsetattr(Self::input_fd(), SetArg::TCSANOW, &self.original)
            .map_err(|e| SerComError::term("tcsetattr", e))
    }
}

impl Read for Console {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        ConsoleIn.read(buf)
    }
}

impl Write for Console {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        ConsoleOut.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Drop for Console {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}
