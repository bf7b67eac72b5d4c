// Terminal control layer - staged line settings behind a narrow seam
pub mod termios;

use crate::domain::config::{FlowMode, ParityMode};
use crate::domain::error::SerComResult;

pub use termios::TermiosPort;

/// Control surface over a serial line's settings.
///
/// Changes are staged into a working copy and take effect only on `apply`,
/// so a rejected configuration never leaves the device half-changed. The
/// session core drives this trait; the termios implementation backs it in
/// production and tests substitute a mock.
pub trait TermControl {
    /// Stage a new baud rate. Fails if the rate has no line-speed encoding.
    fn stage_baud(&mut self, baud: u32) -> SerComResult<()>;

    fn stage_parity(&mut self, parity: ParityMode);

    fn stage_databits(&mut self, bits: u8);

    fn stage_flow(&mut self, flow: FlowMode);

    /// Stage whether the line hangs up (drops DTR) when closed.
    fn set_hangup_on_close(&mut self, enabled: bool);

    /// Push the staged settings to the device.
    fn apply(&mut self) -> SerComResult<()>;

    /// Discard unread input and unsent output.
    fn flush_io(&mut self) -> SerComResult<()>;

    fn raise_dtr(&mut self) -> SerComResult<()>;

    fn lower_dtr(&mut self) -> SerComResult<()>;

    /// Drop DTR for about a second, then raise it again.
    fn pulse_dtr(&mut self) -> SerComResult<()>;

    /// Assert a break condition on the line.
    fn send_break(&mut self) -> SerComResult<()>;

    /// Give up the saved original settings: the device will not be restored
    /// when the handle is dropped.
    fn forget_original(&mut self);
}
