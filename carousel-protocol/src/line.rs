//! Line assembly for the operator console.
//!
//! Bytes arrive one at a time from the UART. A line ends at `\r`, `\n` or
//! `\r\n`; blank lines are skipped. The buffer is fixed at [`MAX_LINE_LEN`]
//! bytes: an oversized line is dropped up to its terminator and reported
//! once, so the next command starts from a clean buffer.

use heapless::String;

/// Maximum command line length in bytes (terminator excluded)
pub const MAX_LINE_LEN: usize = 32;

/// A complete command line, terminator stripped
pub type Line = String<MAX_LINE_LEN>;

/// Errors reported when a line is dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineError {
    /// Line exceeded [`MAX_LINE_LEN`] bytes
    TooLong,
    /// Line contained a byte outside printable ASCII
    InvalidByte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineState {
    /// Accumulating printable bytes
    Collecting,
    /// Dropping bytes until the next terminator
    Discarding(LineError),
}

/// Byte-at-a-time line assembler
#[derive(Debug, Clone)]
pub struct LineBuffer {
    state: LineState,
    buffer: Line,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineBuffer {
    /// Create an empty line buffer
    pub const fn new() -> Self {
        Self {
            state: LineState::Collecting,
            buffer: String::new(),
        }
    }

    /// Drop any partial line
    pub fn reset(&mut self) {
        self.state = LineState::Collecting;
        self.buffer.clear();
    }

    /// Number of bytes buffered for the current line
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Feed a single byte
    ///
    /// Returns `Ok(Some(line))` when a terminator completes a non-empty line,
    /// `Ok(None)` when more bytes are needed, or `Err` when the line that just
    /// ended had to be dropped.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Line>, LineError> {
        if byte == b'\r' || byte == b'\n' {
            return self.finish();
        }

        if let LineState::Discarding(_) = self.state {
            return Ok(None);
        }

        if !(byte == b'\t' || (0x20..0x7F).contains(&byte)) {
            self.buffer.clear();
            self.state = LineState::Discarding(LineError::InvalidByte);
            return Ok(None);
        }

        if self.buffer.push(byte as char).is_err() {
            self.buffer.clear();
            self.state = LineState::Discarding(LineError::TooLong);
        }
        Ok(None)
    }

    /// Feed bytes until one line completes or is dropped
    ///
    /// Returns the outcome (if any) together with the bytes not yet consumed,
    /// so a caller can keep draining a UART read buffer without losing input.
    pub fn feed_bytes<'a>(
        &mut self,
        bytes: &'a [u8],
    ) -> (Option<Result<Line, LineError>>, &'a [u8]) {
        for (i, &byte) in bytes.iter().enumerate() {
            match self.feed(byte) {
                Ok(None) => {}
                Ok(Some(line)) => return (Some(Ok(line)), &bytes[i + 1..]),
                Err(e) => return (Some(Err(e)), &bytes[i + 1..]),
            }
        }
        (None, &[])
    }

    fn finish(&mut self) -> Result<Option<Line>, LineError> {
        let state = self.state;
        self.state = LineState::Collecting;

        if let LineState::Discarding(e) = state {
            self.buffer.clear();
            return Err(e);
        }

        if self.buffer.trim().is_empty() {
            // Blank line, or the `\n` half of `\r\n`
            self.buffer.clear();
            return Ok(None);
        }

        let line = self.buffer.clone();
        self.buffer.clear();
        Ok(Some(line))
    }
}
