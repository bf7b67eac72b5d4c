//! The session event loop and its command/transparent state machine.
//!
//! One loop owns the console and the device. It sleeps in poll(2) until a
//! byte is available on either side or the device can accept queued output,
//! then performs at most one console read, one device read and one queue
//! drain per wakeup, in that order.

use crate::core::cycle;
use crate::core::handoff::{run_transfer, TransferOutcome};
use crate::core::queue::WriteQueue;
use crate::core::reader::{read_line, LineError};
use crate::core::timestamp::TimestampAnnotator;
use crate::domain::config::SessionSettings;
use crate::domain::error::{SerComError, SerComResult};
use crate::infrastructure::console::{Console, ConsoleIn, ConsoleOut};
use crate::infrastructure::signals::ShutdownFlag;
use crate::infrastructure::term::TermControl;
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use std::io::{ErrorKind, Read, Write};
use std::os::fd::AsFd;
use std::time::Instant;
use tracing::debug;

pub const KEY_EXIT: u8 = 0x18; // C-x: end the session
pub const KEY_QUIT: u8 = 0x11; // C-q: end without restoring the device
pub const KEY_PULSE: u8 = 0x10; // C-p: pulse DTR
pub const KEY_TOGGLE: u8 = 0x14; // C-t: toggle DTR
pub const KEY_BAUD_UP: u8 = 0x15; // C-u
pub const KEY_BAUD_DOWN: u8 = 0x04; // C-d
pub const KEY_FLOW: u8 = 0x06; // C-f
pub const KEY_PARITY: u8 = 0x19; // C-y
pub const KEY_BITS: u8 = 0x02; // C-b
pub const KEY_STATUS: u8 = 0x16; // C-v
pub const KEY_SEND: u8 = 0x13; // C-s
pub const KEY_RECEIVE: u8 = 0x12; // C-r
pub const KEY_BREAK: u8 = 0x1c; // C-\
pub const KEY_TIMESTAMP: u8 = 0x09; // C-i

const BELL: &[u8] = b"\x07";
const FNAME_MAX: usize = 128;

/// Console input interpretation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Console bytes pass through to the device.
    Transparent,
    /// The next byte is a command key.
    Command,
}

/// Local control commands reachable from command mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Exit,
    Quit,
    Status,
    PulseDtr,
    ToggleDtr,
    BaudUp,
    BaudDown,
    FlowNext,
    ParityNext,
    DataBitsNext,
    SendFile,
    ReceiveFile,
    Break,
    ToggleTimestamp,
}

impl Command {
    pub fn from_key(key: u8) -> Option<Self> {
        match key {
            KEY_EXIT => Some(Self::Exit),
            KEY_QUIT => Some(Self::Quit),
            KEY_STATUS => Some(Self::Status),
            KEY_PULSE => Some(Self::PulseDtr),
            KEY_TOGGLE => Some(Self::ToggleDtr),
            KEY_BAUD_UP => Some(Self::BaudUp),
            KEY_BAUD_DOWN => Some(Self::BaudDown),
            KEY_FLOW => Some(Self::FlowNext),
            KEY_PARITY => Some(Self::ParityNext),
            KEY_BITS => Some(Self::DataBitsNext),
            KEY_SEND => Some(Self::SendFile),
            KEY_RECEIVE => Some(Self::ReceiveFile),
            KEY_BREAK => Some(Self::Break),
            KEY_TIMESTAMP => Some(Self::ToggleTimestamp),
            _ => None,
        }
    }
}

/// Which transfer direction a command asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    Send,
    Receive,
}

/// What the dispatcher asks the run loop to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exec {
    Continue,
    Exit(LoopExit),
    Transfer(TransferKind),
}

/// How the event loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// Normal exit; the device is restored and released.
    Clean,
    /// Exit leaving the device configured as-is.
    SkipReset,
    /// A termination request was observed at the wait point.
    Terminated,
}

/// Pick the helper command for a transfer. Receiving with a filename flips
/// the direction to an upload of that file.
pub fn transfer_command(
    settings: &SessionSettings,
    kind: TransferKind,
    filename: &str,
) -> (String, Option<String>) {
    match kind {
        TransferKind::Send if filename.is_empty() => (settings.send_cmd.clone(), None),
        TransferKind::Send => (settings.send_cmd.clone(), Some(filename.to_string())),
        TransferKind::Receive if filename.is_empty() => (settings.receive_cmd.clone(), None),
        TransferKind::Receive => (settings.send_cmd.clone(), Some(filename.to_string())),
    }
}

/// The long-lived session: current settings, interpretation mode, DTR state,
/// the outbound write queue and the timestamp annotator, plus exclusive
/// control of the device handle.
pub struct Session<D: TermControl> {
    settings: SessionSettings,
    device: D,
    mode: Mode,
    dtr_up: bool,
    queue: WriteQueue,
    annotator: TimestampAnnotator,
}

impl<D: TermControl> Session<D> {
    pub fn new(settings: SessionSettings, device: D) -> Self {
        let annotator = TimestampAnnotator::new(settings.timestamp);
        Self {
            settings,
            device,
            mode: Mode::Transparent,
            dtr_up: false,
            queue: WriteQueue::new(),
            annotator,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn queue(&self) -> &WriteQueue {
        &self.queue
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn dtr_is_up(&self) -> bool {
        self.dtr_up
    }

    pub fn timestamps_enabled(&self) -> bool {
        self.annotator.is_enabled()
    }

    /// Drive the console state machine with one byte.
    pub fn feed_console_byte(&mut self, byte: u8, out: &mut impl Write) -> SerComResult<Exec> {
        match self.mode {
            Mode::Transparent => {
                if byte == self.settings.escape {
                    self.mode = Mode::Command;
                } else {
                    self.enqueue_byte(byte, out)?;
                }
                Ok(Exec::Continue)
            }
            Mode::Command => {
                // Commands are single-shot: whatever happens next, we are
                // back to passthrough.
                self.mode = Mode::Transparent;
                if byte == self.settings.escape {
                    // Double escape sends the escape character itself.
                    self.enqueue_byte(byte, out)?;
                    return Ok(Exec::Continue);
                }
                match Command::from_key(byte) {
                    Some(cmd) => self.execute(cmd, out),
                    None => Ok(Exec::Continue),
                }
            }
        }
    }

    /// Execute a single command key.
    pub fn execute(&mut self, cmd: Command, out: &mut impl Write) -> SerComResult<Exec> {
        debug!(?cmd, "executing command");
        match cmd {
            Command::Exit => return Ok(Exec::Exit(LoopExit::Clean)),
            Command::Quit => {
                self.device.set_hangup_on_close(false);
                if let Err(e) = self.device.flush_io() {
                    debug!("flush before quit failed: {}", e);
                }
                if let Err(e) = self.device.apply() {
                    write!(out, "\r\n*** cannot clear hangup-on-close: {} ***\r\n", e)?;
                }
                self.device.forget_original();
                return Ok(Exec::Exit(LoopExit::SkipReset));
            }
            Command::SendFile => return Ok(Exec::Transfer(TransferKind::Send)),
            Command::ReceiveFile => return Ok(Exec::Transfer(TransferKind::Receive)),
            Command::Status => {
                write!(out, "\r\n")?;
                write!(out, "*** baud: {}\r\n", self.settings.baud)?;
                write!(out, "*** flow: {}\r\n", self.settings.flow)?;
                write!(out, "*** parity: {}\r\n", self.settings.parity)?;
                write!(out, "*** databits: {}\r\n", self.settings.databits)?;
                write!(out, "*** dtr: {}\r\n", if self.dtr_up { "up" } else { "down" })?;
                write!(
                    out,
                    "*** timestamp: {}\r\n",
                    if self.annotator.is_enabled() { "on" } else { "off" }
                )?;
            }
            Command::PulseDtr => {
                write!(out, "\r\n*** pulse DTR ***\r\n")?;
                if let Err(e) = self.device.pulse_dtr() {
                    write!(out, "*** FAILED: {} ***\r\n", e)?;
                }
            }
            Command::ToggleDtr => {
                let result = if self.dtr_up {
                    self.device.lower_dtr()
                } else {
                    self.device.raise_dtr()
                };
                if result.is_ok() {
                    self.dtr_up = !self.dtr_up;
                }
                write!(
                    out,
                    "\r\n*** DTR: {} ***\r\n",
                    if self.dtr_up { "up" } else { "down" }
                )?;
            }
            Command::BaudUp | Command::BaudDown => {
                let new = if cmd == Command::BaudUp {
                    cycle::baud_up(self.settings.baud)
                } else {
                    cycle::baud_down(self.settings.baud)
                };
                match self.device.stage_baud(new) {
                    Ok(()) => {
                        if self.apply_staged(out)? {
                            self.settings.baud = new;
                        }
                    }
                    Err(e) => write!(out, "\r\n*** cannot change baud: {} ***", e)?,
                }
                write!(out, "\r\n*** baud: {} ***\r\n", self.settings.baud)?;
            }
            Command::FlowNext => {
                let new = cycle::flow_next(self.settings.flow);
                self.device.stage_flow(new);
                if self.apply_staged(out)? {
                    self.settings.flow = new;
                }
                write!(out, "\r\n*** flow: {} ***\r\n", self.settings.flow)?;
            }
            Command::ParityNext => {
                let new = cycle::parity_next(self.settings.parity);
                self.device.stage_parity(new);
                if self.apply_staged(out)? {
                    self.settings.parity = new;
                }
                write!(out, "\r\n*** parity: {} ***\r\n", self.settings.parity)?;
            }
            Command::DataBitsNext => {
                let new = cycle::databits_next(self.settings.databits);
                self.device.stage_databits(new);
                if self.apply_staged(out)? {
                    self.settings.databits = new;
                }
                write!(out, "\r\n*** databits: {} ***\r\n", self.settings.databits)?;
            }
            Command::Break => {
                if let Err(e) = self.device.send_break() {
                    write!(out, "\r\n*** cannot send break: {} ***\r\n", e)?;
                } else {
                    write!(out, "\r\n*** break sent ***\r\n")?;
                }
            }
            Command::ToggleTimestamp => {
                if self.annotator.toggle() {
                    write!(out, "\r\n*** timestamps enabled ***\r\n")?;
                } else {
                    write!(out, "\r\n*** timestamps disabled ***\r\n")?;
                }
            }
        }
        Ok(Exec::Continue)
    }

    /// Commit a staged parameter change. Pending queued bytes were framed for
    /// the old configuration, so they are discarded along with any in-flight
    /// device output before the new settings go live.
    fn apply_staged(&mut self, out: &mut impl Write) -> SerComResult<bool> {
        self.queue.clear();
        if let Err(e) = self.device.flush_io() {
            debug!("flush before reconfigure failed: {}", e);
        }
        match self.device.apply() {
            Ok(()) => Ok(true),
            Err(e) => {
                write!(out, "\r\n*** cannot reconfigure device: {} ***", e)?;
                Ok(false)
            }
        }
    }

    fn enqueue_byte(&mut self, byte: u8, out: &mut impl Write) -> SerComResult<()> {
        if !self.queue.enqueue(byte) {
            out.write_all(BELL)?;
        }
        Ok(())
    }
}

impl<D: TermControl + AsFd + Read + Write> Session<D> {
    /// Run the event loop until exit, a termination request or a fatal error.
    pub fn run(&mut self, console: &mut Console, shutdown: &ShutdownFlag) -> SerComResult<LoopExit> {
        loop {
            if shutdown.is_set() {
                return Ok(LoopExit::Terminated);
            }

            let (console_ready, device_readable, device_writable) = {
                let device_events = if self.queue.is_empty() {
                    PollFlags::POLLIN
                } else {
                    PollFlags::POLLIN | PollFlags::POLLOUT
                };
                let mut fds = [
                    PollFd::new(Console::input_fd(), PollFlags::POLLIN),
                    PollFd::new(self.device.as_fd(), device_events),
                ];
                match poll(&mut fds, PollTimeout::NONE) {
                    Ok(_) => {}
                    Err(Errno::EINTR) => continue,
                    Err(e) => return Err(SerComError::term("poll", e)),
                }
                let readable = PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR;
                (
                    fds[0].revents().is_some_and(|r| r.intersects(readable)),
                    fds[1].revents().is_some_and(|r| r.intersects(readable)),
                    fds[1].revents().is_some_and(|r| r.contains(PollFlags::POLLOUT)),
                )
            };

            if console_ready {
                let byte = read_console_byte(console)?;
                match self.feed_console_byte(byte, console)? {
                    Exec::Continue => {}
                    Exec::Exit(exit) => return Ok(exit),
                    Exec::Transfer(kind) => self.transfer(kind, console)?,
                }
            }

            if device_readable {
                if let Some(byte) = self.read_device_byte()? {
                    if let Some(marker) = self.annotator.annotate(byte, Instant::now()) {
                        write_console(console, marker.as_bytes())?;
                    }
                    write_console(console, &[byte])?;
                }
            }

            if device_writable && !self.queue.is_empty() {
                self.drain_queue()?;
            }
        }
    }

    /// Collect a filename on the console, then hand the device to the
    /// transfer helper. Helper failures are reported, never fatal.
    fn transfer(&mut self, kind: TransferKind, console: &mut Console) -> SerComResult<()> {
        write_console(console, b"\r\n*** file: ")?;
        let name = match read_line(&mut ConsoleIn, &mut ConsoleOut, FNAME_MAX) {
            Ok(name) => name,
            Err(LineError::Interrupted) => {
                write_console(console, b"\r\n")?;
                return Ok(());
            }
            Err(LineError::Closed) => return Err(SerComError::ConsoleClosed),
            Err(LineError::Io(e)) => return Err(e.into()),
        };
        write_console(console, b"\r\n")?;

        let (template, filename) = transfer_command(&self.settings, kind, name.trim());
        match run_transfer(&self.device, console, &template, filename.as_deref()) {
            Ok(TransferOutcome::Exited(code)) => {
                write_console(console, format!("\r\n*** exit status: {} ***\r\n", code).as_bytes())?;
            }
            Ok(TransferOutcome::Signaled(sig)) => {
                write_console(
                    console,
                    format!("\r\n*** abnormal termination: {} ***\r\n", sig).as_bytes(),
                )?;
            }
            Err(SerComError::Handoff { message }) => {
                write_console(console, format!("\r\n*** {} ***\r\n", message).as_bytes())?;
            }
            Err(e) => return Err(e),
        }

        // The helper may have reconfigured the line underneath us.
        if let Err(e) = self.device.apply() {
            write_console(
                console,
                format!("\r\n*** cannot reapply device settings: {} ***\r\n", e).as_bytes(),
            )?;
        }
        Ok(())
    }

    fn read_device_byte(&mut self) -> SerComResult<Option<u8>> {
        let mut buf = [0u8; 1];
        loop {
            match self.device.read(&mut buf) {
                Ok(0) => return Err(SerComError::DeviceClosed),
                Ok(_) => return Ok(Some(buf[0])),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn drain_queue(&mut self) -> SerComResult<()> {
        loop {
            match self.device.write(self.queue.as_bytes()) {
                Ok(0) => return Err(SerComError::DeviceClosed),
                Ok(n) => {
                    self.queue.drain_ready(n);
                    return Ok(());
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                // Spurious readiness; the next poll will try again.
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn read_console_byte(console: &mut Console) -> SerComResult<u8> {
    let mut buf = [0u8; 1];
    loop {
        match console.read(&mut buf) {
            Ok(0) => return Err(SerComError::ConsoleClosed),
            Ok(_) => return Ok(buf[0]),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

/// Write to the console, retrying the transient conditions a just-signalled
/// or momentarily full pipe produces. Persistent failure is fatal.
fn write_console(console: &mut Console, buf: &[u8]) -> SerComResult<()> {
    let mut written = 0;
    while written < buf.len() {
        match console.write(&buf[written..]) {
            Ok(0) => return Err(SerComError::ConsoleClosed),
            Ok(n) => written += n,
            Err(e) if matches!(e.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock) => {
                continue
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
