// Domain module - Settings and error types
pub mod config;
pub mod error;

pub use config::{FlowMode, ParityMode, SessionSettings};
pub use error::{SerComError, SerComResult};
