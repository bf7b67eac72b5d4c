use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Parity configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParityMode {
    None,
    Even,
    Odd,
}

/// Flow control configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowMode {
    None,
    Hardware,
    Software,
}

impl std::fmt::Display for ParityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParityMode::None => write!(f, "none"),
            ParityMode::Even => write!(f, "even"),
            ParityMode::Odd => write!(f, "odd"),
        }
    }
}

impl std::fmt::Display for FlowMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowMode::None => write!(f, "none"),
            FlowMode::Hardware => write!(f, "RTS/CTS"),
            FlowMode::Software => write!(f, "xon/xoff"),
        }
    }
}

impl Default for ParityMode {
    fn default() -> Self {
        ParityMode::None
    }
}

impl Default for FlowMode {
    fn default() -> Self {
        FlowMode::None
    }
}

/// Effective settings for one device session.
///
/// Built by layering CLI arguments over the defaults file over the built-in
/// defaults. The session owns a copy and mutates it only after the terminal
/// layer has accepted the corresponding change.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Serial device path
    pub port: PathBuf,
    /// Baud rate
    pub baud: u32,
    /// Parity mode
    pub parity: ParityMode,
    /// Data bits (5-8)
    pub databits: u8,
    /// Flow control mode
    pub flow: FlowMode,
    /// Escape character (a control byte)
    pub escape: u8,
    /// Attach to the device without configuring it
    pub no_init: bool,
    /// Leave the device configuration in place on exit
    pub no_reset: bool,
    /// Skip UUCP advisory locking
    pub no_lock: bool,
    /// Command template for uploading a file
    pub send_cmd: String,
    /// Command template for receiving files
    pub receive_cmd: String,
    /// Start with timestamp annotation enabled
    pub timestamp: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            port: PathBuf::new(),
            baud: default_baud(),
            parity: ParityMode::None,
            databits: default_databits(),
            flow: FlowMode::None,
            escape: default_escape(),
            no_init: false,
            no_reset: false,
            no_lock: false,
            send_cmd: default_send_cmd(),
            receive_cmd: default_receive_cmd(),
            timestamp: false,
        }
    }
}

impl SessionSettings {
    /// Escape byte rendered as the `C-x` notation used in the banner.
    pub fn escape_label(&self) -> String {
        format!("C-{}", (b'a' + self.escape.wrapping_sub(1)) as char)
    }
}

/// Optional defaults loaded from `~/.config/sercom/config.toml`.
///
/// Every field is optional; present fields override the built-in defaults and
/// are in turn overridden by command-line arguments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub baud: Option<u32>,
    #[serde(default)]
    pub parity: Option<ParityMode>,
    #[serde(default)]
    pub databits: Option<u8>,
    #[serde(default)]
    pub flow: Option<FlowMode>,
    /// Escape character as a single letter, e.g. "a" for C-a
    #[serde(default)]
    pub escape: Option<char>,
    #[serde(default)]
    pub send_cmd: Option<String>,
    #[serde(default)]
    pub receive_cmd: Option<String>,
    #[serde(default)]
    pub timestamp: Option<bool>,
}

/// Map a letter to its control byte: 'a' or 'A' -> 0x01.
pub fn escape_code(letter: char) -> Option<u8> {
    if letter.is_ascii_uppercase() {
        Some(letter as u8 - b'A' + 1)
    } else if letter.is_ascii_lowercase() {
        Some(letter as u8 - b'a' + 1)
    } else {
        None
    }
}

// Default value functions
fn default_baud() -> u32 {
    115200
}

fn default_databits() -> u8 {
    8
}

fn default_escape() -> u8 {
    0x01 // C-a
}

fn default_send_cmd() -> String {
    "ascii_xfr -s -v -l10".to_string()
}

fn default_receive_cmd() -> String {
    "rz -vv".to_string()
}
