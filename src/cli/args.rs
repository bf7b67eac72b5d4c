use crate::domain::config::{escape_code, FileConfig, FlowMode, ParityMode, SessionSettings};
use crate::domain::error::{SerComError, SerComResult};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Command line arguments for SerCom
#[derive(Parser, Debug)]
#[command(
    name = "sercom",
    version = env!("CARGO_PKG_VERSION"),
    about = "Interactive serial terminal for modems and embedded devices",
    long_about = "A dumb-terminal program for manually driving serial devices: raw byte \
passthrough with single-keystroke commands for baud/flow/parity/databits cycling, DTR \
control, break, timestamps and file-transfer handoff."
)]
pub struct Args {
    /// Serial device path (e.g. /dev/ttyUSB0)
    #[arg(required_unless_present = "list")]
    pub device: Option<PathBuf>,

    /// Baud rate
    #[arg(short, long)]
    pub baud: Option<u32>,

    /// Flow control
    #[arg(short, long, value_enum)]
    pub flow: Option<FlowArg>,

    /// Parity
    #[arg(short, long, value_enum)]
    pub parity: Option<ParityArg>,

    /// Data bits
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(5..=8))]
    pub databits: Option<u8>,

    /// Escape character, given as a letter: "a" means C-a
    #[arg(short, long)]
    pub escape: Option<char>,

    /// Attach to the device without initializing it
    #[arg(long)]
    pub no_init: bool,

    /// Do not restore the device configuration on exit
    #[arg(long)]
    pub no_reset: bool,

    /// Skip advisory UUCP locking
    #[arg(long)]
    pub no_lock: bool,

    /// Command used to upload a file
    #[arg(short, long)]
    pub send_cmd: Option<String>,

    /// Command used to receive files
    #[arg(short = 'v', long)]
    pub receive_cmd: Option<String>,

    /// Enable per-line timestamp annotation
    #[arg(short, long)]
    pub timestamp: bool,

    /// List available serial ports and exit
    #[arg(short, long)]
    pub list: bool,

    /// Defaults file path (instead of ~/.config/sercom/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long)]
    pub verbose: bool,
}

/// Parity argument
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum ParityArg {
    None,
    Even,
    Odd,
}

/// Flow control argument
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum FlowArg {
    None,
    Hardware,
    Software,
}

impl From<ParityArg> for ParityMode {
    fn from(parity: ParityArg) -> Self {
        match parity {
            ParityArg::None => Self::None,
            ParityArg::Even => Self::Even,
            ParityArg::Odd => Self::Odd,
        }
    }
}

impl From<FlowArg> for FlowMode {
    fn from(flow: FlowArg) -> Self {
        match flow {
            FlowArg::None => Self::None,
            FlowArg::Hardware => Self::Hardware,
            FlowArg::Software => Self::Software,
        }
    }
}

impl Args {
    /// Resolve the effective settings: arguments override the defaults file,
    /// which overrides the built-in defaults.
    pub fn into_settings(self, file: FileConfig) -> SerComResult<SessionSettings> {
        let defaults = SessionSettings::default();

        let port = self.device.ok_or_else(|| SerComError::Config {
            message: "no device given".to_string(),
        })?;

        let escape = match self.escape.or(file.escape) {
            Some(letter) => escape_code(letter).ok_or_else(|| SerComError::Config {
                message: format!("escape must be a letter, got {:?}", letter),
            })?,
            None => defaults.escape,
        };

        Ok(SessionSettings {
            port,
            baud: self.baud.or(file.baud).unwrap_or(defaults.baud),
            parity: self
                .parity
                .map(ParityMode::from)
                .or(file.parity)
                .unwrap_or(defaults.parity),
            databits: self.databits.or(file.databits).unwrap_or(defaults.databits),
            flow: self
                .flow
                .map(FlowMode::from)
                .or(file.flow)
                .unwrap_or(defaults.flow),
            escape,
            no_init: self.no_init,
            no_reset: self.no_reset,
            no_lock: self.no_lock,
            send_cmd: self.send_cmd.or(file.send_cmd).unwrap_or(defaults.send_cmd),
            receive_cmd: self
                .receive_cmd
                .or(file.receive_cmd)
                .unwrap_or(defaults.receive_cmd),
            timestamp: self.timestamp || file.timestamp.unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_invocation() {
        let args = Args::try_parse_from(["sercom", "/dev/ttyUSB0"]).unwrap();
        assert_eq!(args.device.as_deref(), Some(std::path::Path::new("/dev/ttyUSB0")));
        let settings = args.into_settings(FileConfig::default()).unwrap();
        assert_eq!(settings.baud, 115200);
        assert_eq!(settings.escape, 0x01);
    }

    #[test]
    fn test_device_required_unless_listing() {
        assert!(Args::try_parse_from(["sercom"]).is_err());
        assert!(Args::try_parse_from(["sercom", "--list"]).is_ok());
    }

    #[test]
    fn test_full_invocation() {
        let args = Args::try_parse_from([
            "sercom",
            "/dev/ttyS0",
            "--baud",
            "9600",
            "--flow",
            "hardware",
            "--parity",
            "odd",
            "--databits",
            "7",
            "--escape",
            "b",
            "--no-reset",
            "--timestamp",
        ])
        .unwrap();
        let settings = args.into_settings(FileConfig::default()).unwrap();
        assert_eq!(settings.baud, 9600);
        assert_eq!(settings.flow, FlowMode::Hardware);
        assert_eq!(settings.parity, ParityMode::Odd);
        assert_eq!(settings.databits, 7);
        assert_eq!(settings.escape, 0x02);
        assert!(settings.no_reset);
        assert!(settings.timestamp);
    }

    #[test]
    fn test_databits_range_is_enforced() {
        assert!(Args::try_parse_from(["sercom", "/dev/ttyS0", "-d", "9"]).is_err());
        assert!(Args::try_parse_from(["sercom", "/dev/ttyS0", "-d", "5"]).is_ok());
    }

    #[test]
    fn test_args_override_file_defaults() {
        let args = Args::try_parse_from(["sercom", "/dev/ttyS0", "--baud", "19200"]).unwrap();
        let file = FileConfig {
            baud: Some(9600),
            escape: Some('c'),
            send_cmd: Some("sz -vv".to_string()),
            ..FileConfig::default()
        };
        let settings = args.into_settings(file).unwrap();
        assert_eq!(settings.baud, 19200);
        assert_eq!(settings.escape, 0x03);
        assert_eq!(settings.send_cmd, "sz -vv");
    }

    #[test]
    fn test_bad_escape_is_rejected() {
        let args = Args::try_parse_from(["sercom", "/dev/ttyS0", "--escape", "1"]).unwrap();
        assert!(args.into_settings(FileConfig::default()).is_err());
    }
}
