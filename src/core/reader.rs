//! Minimal line editor used to collect a filename on the raw console.

use std::io::{ErrorKind, Read, Write};

const BELL: &[u8] = b"\x07";

/// Why a line read ended without a line.
#[derive(Debug, thiserror::Error)]
pub enum LineError {
    /// The read was interrupted by a signal before completion.
    #[error("read interrupted")]
    Interrupted,
    /// The input stream closed mid-line.
    #[error("input closed")]
    Closed,
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Read a bounded line with destructive backspace editing.
///
/// Backspace removes the last buffered character and erases it on screen, or
/// rings the bell when the buffer is empty. Carriage return terminates the
/// line. Any other byte is appended and echoed while room remains; overflow
/// rings the bell and drops the byte.
pub fn read_line<R: Read, W: Write>(
    input: &mut R,
    echo: &mut W,
    max: usize,
) -> Result<String, LineError> {
    let mut line: Vec<u8> = Vec::with_capacity(max);
    let mut byte = [0u8; 1];

    loop {
        match input.read(&mut byte) {
            Ok(0) => return Err(LineError::Closed),
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::Interrupted => return Err(LineError::Interrupted),
            Err(e) => return Err(LineError::Io(e)),
        }

        match byte[0] {
            b'\x08' => {
                if line.pop().is_some() {
                    echo.write_all(b"\x08 \x08")?;
                } else {
                    echo.write_all(BELL)?;
                }
            }
            b'\r' => {
                echo.flush()?;
                return Ok(String::from_utf8_lossy(&line).into_owned());
            }
            c => {
                if line.len() < max {
                    line.push(c);
                    echo.write_all(&byte)?;
                } else {
                    echo.write_all(BELL)?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_plain_line() {
        let mut input = Cursor::new(b"firmware.bin\r".to_vec());
        let mut echo = Vec::new();
        let line = read_line(&mut input, &mut echo, 128).unwrap();
        assert_eq!(line, "firmware.bin");
        assert_eq!(echo, b"firmware.bin");
    }

    #[test]
    fn test_backspace_edits_buffer_and_screen() {
        let mut input = Cursor::new(b"abz\x08c\r".to_vec());
        let mut echo = Vec::new();
        let line = read_line(&mut input, &mut echo, 128).unwrap();
        assert_eq!(line, "abc");
        assert_eq!(echo, b"abz\x08 \x08c");
    }

    #[test]
    fn test_backspace_on_empty_rings_bell() {
        let mut input = Cursor::new(b"\x08a\r".to_vec());
        let mut echo = Vec::new();
        let line = read_line(&mut input, &mut echo, 128).unwrap();
        assert_eq!(line, "a");
        assert_eq!(echo, b"\x07a");
    }

    #[test]
    fn test_overflow_drops_byte_and_rings_bell() {
        let mut input = Cursor::new(b"abcd\r".to_vec());
        let mut echo = Vec::new();
        let line = read_line(&mut input, &mut echo, 3).unwrap();
        assert_eq!(line, "abc");
        assert_eq!(echo, b"abc\x07");
    }

    #[test]
    fn test_empty_line() {
        let mut input = Cursor::new(b"\r".to_vec());
        let mut echo = Vec::new();
        let line = read_line(&mut input, &mut echo, 16).unwrap();
        assert!(line.is_empty());
    }

    #[test]
    fn test_closed_input() {
        let mut input = Cursor::new(Vec::new());
        let mut echo = Vec::new();
        let err = read_line(&mut input, &mut echo, 16).unwrap_err();
        assert!(matches!(err, LineError::Closed));
    }

    struct InterruptedReader;

    impl Read for InterruptedReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::Interrupted))
        }
    }

    #[test]
    fn test_interrupted_read_is_distinguished() {
        let mut echo = Vec::new();
        let err = read_line(&mut InterruptedReader, &mut echo, 16).unwrap_err();
        assert!(matches!(err, LineError::Interrupted));
    }
}
