//! Per-line timestamp annotation for bytes arriving from the device.

use std::time::Instant;

/// Where the annotator is relative to the current output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StampState {
    /// About to start a new measurement window; the next byte captures the
    /// reference instant.
    Reset,
    /// A line just ended; the next line still gets a marker.
    Displayed,
    /// Current line already annotated (or annotation is off).
    Idle,
}

/// Emits one elapsed-time marker per output line, before the line's first
/// non-newline byte. The reference instant is captured when the window is
/// armed, so markers show time elapsed since annotation was enabled.
#[derive(Debug)]
pub struct TimestampAnnotator {
    enabled: bool,
    state: StampState,
    reference: Option<Instant>,
}

impl TimestampAnnotator {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            state: StampState::Reset,
            reference: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Flip annotation on or off. Turning it on re-arms the reference
    /// capture. Returns the new enabled state.
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        if self.enabled {
            self.state = StampState::Reset;
            self.reference = None;
        }
        self.enabled
    }

    /// Feed one device byte. Returns the marker to print before the byte, if
    /// this byte starts an unannotated line.
    pub fn annotate(&mut self, byte: u8, now: Instant) -> Option<String> {
        let mut marker = None;

        if self.enabled && self.state != StampState::Idle {
            if self.state == StampState::Reset {
                self.reference = Some(now);
            }
            if byte != b'\n' && byte != b'\r' {
                let reference = self.reference.unwrap_or(now);
                marker = Some(format_marker(now.duration_since(reference)));
                self.state = StampState::Idle;
            }
        }

        if byte == b'\n' || byte == b'\r' {
            self.state = StampState::Displayed;
        }

        marker
    }
}

fn format_marker(elapsed: std::time::Duration) -> String {
    let secs = elapsed.as_secs();
    let millis = elapsed.subsec_millis();
    format!("\x1b[36m{}:{:02}.{:03} \x1b[0m", secs / 60, secs % 60, millis)
}
