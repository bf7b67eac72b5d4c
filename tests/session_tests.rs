//! Command-protocol scenarios driven through the public session API.

use sercom::core::session::{
    transfer_command, Command, Exec, LoopExit, Mode, Session, TransferKind, KEY_BAUD_UP, KEY_EXIT,
    KEY_QUIT,
};
use sercom::domain::config::{FlowMode, ParityMode, SessionSettings};
use sercom::domain::error::{SerComError, SerComResult};
use sercom::infrastructure::term::TermControl;

/// Terminal layer double that records staged values and can reject `apply`.
#[derive(Default)]
struct RecordingTerm {
    baud: Option<u32>,
    parity: Option<ParityMode>,
    databits: Option<u8>,
    flow: Option<FlowMode>,
    reject_apply: bool,
    applies: usize,
}

impl TermControl for RecordingTerm {
    fn stage_baud(&mut self, baud: u32) -> SerComResult<()> {
        self.baud = Some(baud);
        Ok(())
    }
    fn stage_parity(&mut self, parity: ParityMode) {
        self.parity = Some(parity);
    }
    fn stage_databits(&mut self, bits: u8) {
        self.databits = Some(bits);
    }
    fn stage_flow(&mut self, flow: FlowMode) {
        self.flow = Some(flow);
    }
    fn set_hangup_on_close(&mut self, _enabled: bool) {}
    fn apply(&mut self) -> SerComResult<()> {
        if self.reject_apply {
            Err(SerComError::Config {
                message: "rejected".to_string(),
            })
        } else {
            self.applies += 1;
            Ok(())
        }
    }
    fn flush_io(&mut self) -> SerComResult<()> {
        Ok(())
    }
    fn raise_dtr(&mut self) -> SerComResult<()> {
        Ok(())
    }
    fn lower_dtr(&mut self) -> SerComResult<()> {
        Ok(())
    }
    fn pulse_dtr(&mut self) -> SerComResult<()> {
        Ok(())
    }
    fn send_break(&mut self) -> SerComResult<()> {
        Ok(())
    }
    fn forget_original(&mut self) {}
}

fn session_with(settings: SessionSettings) -> Session<RecordingTerm> {
    Session::new(settings, RecordingTerm::default())
}

fn nine_six_settings() -> SessionSettings {
    SessionSettings {
        baud: 9600,
        parity: ParityMode::None,
        databits: 8,
        flow: FlowMode::None,
        ..SessionSettings::default()
    }
}

#[test]
fn baud_up_command_end_to_end() {
    let mut session = session_with(nine_six_settings());
    let mut out = Vec::new();
    let escape = session.settings().escape;

    session.feed_console_byte(escape, &mut out).unwrap();
    assert_eq!(session.mode(), Mode::Command);
    let exec = session.feed_console_byte(KEY_BAUD_UP, &mut out).unwrap();

    assert_eq!(exec, Exec::Continue);
    assert_eq!(session.settings().baud, 19200);
    assert_eq!(session.settings().parity, ParityMode::None);
    assert_eq!(session.settings().databits, 8);
    assert_eq!(session.settings().flow, FlowMode::None);
    assert_eq!(session.device().baud, Some(19200));
    assert_eq!(session.mode(), Mode::Transparent);
}

#[test]
fn rejected_apply_leaves_configuration_unchanged() {
    let mut session = session_with(nine_six_settings());
    session.device_mut().reject_apply = true;
    let mut out = Vec::new();

    session.execute(Command::BaudUp, &mut out).unwrap();
    assert_eq!(session.settings().baud, 9600);

    session.execute(Command::FlowNext, &mut out).unwrap();
    assert_eq!(session.settings().flow, FlowMode::None);

    session.execute(Command::ParityNext, &mut out).unwrap();
    assert_eq!(session.settings().parity, ParityMode::None);

    session.execute(Command::DataBitsNext, &mut out).unwrap();
    assert_eq!(session.settings().databits, 8);
}

#[test]
fn successful_change_empties_the_queue() {
    let mut session = session_with(nine_six_settings());
    let mut out = Vec::new();
    for &b in b"queued for 9600" {
        session.feed_console_byte(b, &mut out).unwrap();
    }
    assert!(!session.queue().is_empty());

    session.execute(Command::BaudUp, &mut out).unwrap();
    assert!(session.queue().is_empty());
}

#[test]
fn transparent_bytes_pass_unchanged() {
    let mut session = session_with(SessionSettings::default());
    let mut out = Vec::new();
    let escape = session.settings().escape;

    let bytes: Vec<u8> = (0u8..=255).filter(|&b| b != escape).take(200).collect();
    for &b in &bytes {
        session.feed_console_byte(b, &mut out).unwrap();
        assert_eq!(session.mode(), Mode::Transparent);
    }
    assert_eq!(session.queue().as_bytes(), &bytes[..]);
}

#[test]
fn double_escape_sends_a_single_literal_escape() {
    let mut session = session_with(SessionSettings::default());
    let mut out = Vec::new();
    let escape = session.settings().escape;

    session.feed_console_byte(escape, &mut out).unwrap();
    session.feed_console_byte(escape, &mut out).unwrap();

    assert_eq!(session.queue().as_bytes(), &[escape]);
    assert_eq!(session.mode(), Mode::Transparent);
}

#[test]
fn exit_and_quit_report_their_loop_exit() {
    let mut session = session_with(SessionSettings::default());
    let mut out = Vec::new();
    let escape = session.settings().escape;

    session.feed_console_byte(escape, &mut out).unwrap();
    assert_eq!(
        session.feed_console_byte(KEY_EXIT, &mut out).unwrap(),
        Exec::Exit(LoopExit::Clean)
    );

    session.feed_console_byte(escape, &mut out).unwrap();
    assert_eq!(
        session.feed_console_byte(KEY_QUIT, &mut out).unwrap(),
        Exec::Exit(LoopExit::SkipReset)
    );
}

#[test]
fn receive_with_empty_filename_uses_receive_template() {
    let settings = SessionSettings {
        send_cmd: "sz -b".to_string(),
        receive_cmd: "rz -b".to_string(),
        ..SessionSettings::default()
    };

    let (cmd, file) = transfer_command(&settings, TransferKind::Receive, "");
    assert_eq!(cmd, "rz -b");
    assert!(file.is_none());
}

#[test]
fn receive_with_filename_switches_to_send_template() {
    let settings = SessionSettings {
        send_cmd: "sz -b".to_string(),
        receive_cmd: "rz -b".to_string(),
        ..SessionSettings::default()
    };

    let (cmd, file) = transfer_command(&settings, TransferKind::Receive, "image.hex");
    assert_eq!(cmd, "sz -b");
    assert_eq!(file.as_deref(), Some("image.hex"));
}
