//! Termios-backed implementation of the terminal control layer.

use crate::domain::config::{FlowMode, ParityMode, SessionSettings};
use crate::domain::error::{SerComError, SerComResult};
use crate::infrastructure::term::TermControl;
use nix::errno::Errno;
use nix::libc;
use nix::sys::termios::{
    self, cfmakeraw, tcflush, tcgetattr, tcsendbreak, tcsetattr, BaudRate, ControlFlags,
    FlushArg, InputFlags, SetArg, SpecialCharacterIndices, Termios,
};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::time::Duration;
use tracing::debug;

/// Exclusive handle on the serial device.
///
/// Opens the device non-blocking, snapshots the original line settings and
/// restores them on drop unless `forget_original` was called. New settings
/// accumulate in a staged copy and reach the hardware on `apply`.
pub struct TermiosPort {
    file: File,
    original: Termios,
    staged: Termios,
    restore_on_drop: bool,
}

impl TermiosPort {
    /// Open the device and stage its initial configuration. With `no_init`
    /// set, the current line settings are kept as-is.
    pub fn open(settings: &SessionSettings) -> SerComResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK | libc::O_NOCTTY)
            .open(&settings.port)?;

        let original = tcgetattr(file.as_fd()).map_err(|e| SerComError::term("tcgetattr", e))?;
        let staged = original.clone();
        debug!(port = %settings.port.display(), "serial device opened");

        let mut port = Self {
            file,
            original,
            staged,
            restore_on_drop: true,
        };
        if !settings.no_init {
            port.stage_session(settings)?;
        }
        Ok(port)
    }

    fn stage_session(&mut self, settings: &SessionSettings) -> SerComResult<()> {
        cfmakeraw(&mut self.staged);
        self.staged.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        self.staged.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
        self.staged
            .control_flags
            .insert(ControlFlags::CLOCAL | ControlFlags::CREAD);
        self.set_hangup_on_close(!settings.no_reset);
        self.stage_baud(settings.baud)?;
        self.stage_parity(settings.parity);
        self.stage_databits(settings.databits);
        self.stage_flow(settings.flow);
        Ok(())
    }

    fn set_dtr(&self, raise: bool) -> SerComResult<()> {
        let bits: libc::c_int = libc::TIOCM_DTR;
        let request = if raise {
            libc::TIOCMBIS
        } else {
            libc::TIOCMBIC
        };
        let rc = unsafe { libc::ioctl(self.file.as_raw_fd(), request, &bits) };
        if rc < 0 {
            Err(SerComError::term("ioctl(TIOCM)", Errno::last()))
        } else {
            Ok(())
        }
    }
}

/// Map a numeric rate onto its termios encoding. Only the rates on the
/// interactive cycling ladder are supported.
fn baud_flag(baud: u32) -> Option<BaudRate> {
    match baud {
        300 => Some(BaudRate::B300),
        600 => Some(BaudRate::B600),
        1200 => Some(BaudRate::B1200),
        2400 => Some(BaudRate::B2400),
        4800 => Some(BaudRate::B4800),
        9600 => Some(BaudRate::B9600),
        19200 => Some(BaudRate::B19200),
        38400 => Some(BaudRate::B38400),
        57600 => Some(BaudRate::B57600),
        115200 => Some(BaudRate::B115200),
        _ => None,
    }
}

impl TermControl for TermiosPort {
    fn stage_baud(&mut self, baud: u32) -> SerComResult<()> {
        let rate = baud_flag(baud).ok_or_else(|| SerComError::Config {
            message: format!("unsupported baud rate: {}", baud),
        })?;
        termios::cfsetospeed(&mut self.staged, rate)
            .map_err(|e| SerComError::term("cfsetospeed", e))?;
        termios::cfsetispeed(&mut self.staged, rate)
            .map_err(|e| SerComError::term("cfsetispeed", e))?;
        Ok(())
    }

    fn stage_parity(&mut self, parity: ParityMode) {
        let flags = &mut self.staged.control_flags;
        match parity {
            ParityMode::None => {
                flags.remove(ControlFlags::PARENB | ControlFlags::PARODD);
            }
            ParityMode::Even => {
                flags.insert(ControlFlags::PARENB);
                flags.remove(ControlFlags::PARODD);
            }
            ParityMode::Odd => {
                flags.insert(ControlFlags::PARENB | ControlFlags::PARODD);
            }
        }
    }

    fn stage_databits(&mut self, bits: u8) {
        let size = match bits {
            5 => ControlFlags::CS5,
            6 => ControlFlags::CS6,
            7 => ControlFlags::CS7,
            _ => ControlFlags::CS8,
        };
        self.staged.control_flags.remove(ControlFlags::CSIZE);
        self.staged.control_flags.insert(size);
    }

    fn stage_flow(&mut self, flow: FlowMode) {
        let soft = InputFlags::IXON | InputFlags::IXOFF;
        match flow {
            FlowMode::None => {
                self.staged.control_flags.remove(ControlFlags::CRTSCTS);
                self.staged.input_flags.remove(soft);
            }
            FlowMode::Hardware => {
                self.staged.control_flags.insert(ControlFlags::CRTSCTS);
                self.staged.input_flags.remove(soft);
            }
            FlowMode::Software => {
                self.staged.control_flags.remove(ControlFlags::CRTSCTS);
                self.staged.input_flags.insert(soft);
            }
        }
    }

    fn set_hangup_on_close(&mut self, enabled: bool) {
        if enabled {
            self.staged.control_flags.insert(ControlFlags::HUPCL);
        } else {
            self.staged.control_flags.remove(ControlFlags::HUPCL);
        }
    }

    fn apply(&mut self) -> SerComResult<()> {
        tcsetattr(self.file.as_fd(), SetArg::TCSANOW, &self.staged)
            .map_err(|e| SerComError::term("tcsetattr", e))
    }

    fn flush_io(&mut self) -> SerComResult<()> {
        tcflush(self.file.as_fd(), FlushArg::TCIOFLUSH).map_err(|e| SerComError::term("tcflush", e))
    }

    fn raise_dtr(&mut self) -> SerComResult<()> {
        self.set_dtr(true)
    }

    fn lower_dtr(&mut self) -> SerComResult<()> {
        self.set_dtr(false)
    }

    fn pulse_dtr(&mut self) -> SerComResult<()> {
        self.set_dtr(false)?;
        std::thread::sleep(Duration::from_secs(1));
        self.set_dtr(true)
    }

    fn send_break(&mut self) -> SerComResult<()> {
        tcsendbreak(self.file.as_fd(), 0).map_err(|e| SerComError::term("tcsendbreak", e))
    }

    fn forget_original(&mut self) {
        self.restore_on_drop = false;
    }
}

impl Read for TermiosPort {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        (&self.file).read(buf)
    }
}

impl Write for TermiosPort {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        (&self.file).write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        (&self.file).flush()
    }
}

impl AsFd for TermiosPort {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

impl AsRawFd for TermiosPort {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl Drop for TermiosPort {
    fn drop(&mut self) {
        if self.restore_on_drop {
            let _ = tcsetattr(self.file.as_fd(), SetArg::TCSANOW, &self.original);
        }
    }
}
