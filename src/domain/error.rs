use thiserror::Error;

/// SerCom unified error type
#[derive(Error, Debug)]
pub enum SerComError {
    #[error("terminal control failed in {op}: {source}")]
    Terminal {
        op: &'static str,
        #[source]
        source: nix::errno::Errno,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("console closed")]
    ConsoleClosed,

    #[error("device closed")]
    DeviceClosed,

    #[error("device is locked: {message}")]
    Locked { message: String },

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("transfer handoff failed: {message}")]
    Handoff { message: String },
}

impl SerComError {
    pub(crate) fn term(op: &'static str, source: nix::errno::Errno) -> Self {
        Self::Terminal { op, source }
    }
}

pub type SerComResult<T> = Result<T, SerComError>;
