//! SerCom Library
//!
//! Interactive serial terminal: transparent byte passthrough between the
//! console and a serial device, single-keystroke control commands behind an
//! escape character, and a fork/exec handoff for file-transfer helpers.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use crate::core::session::{LoopExit, Session};
pub use crate::domain::config::{FlowMode, ParityMode, SessionSettings};
pub use crate::domain::error::{SerComError, SerComResult};
pub use crate::infrastructure::term::{TermControl, TermiosPort};
