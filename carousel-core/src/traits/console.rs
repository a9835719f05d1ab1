//! Command line source trait

use carousel_protocol::{Line, LineError};
use heapless::Deque;

/// Delivers complete command lines from the operator console
///
/// Assembling bytes into lines (and dropping oversized ones) happens on the
/// transport side, typically with [`carousel_protocol::LineBuffer`].
pub trait LineSource {
    /// Next pending line, if any; never blocks
    fn next_line(&mut self) -> Option<Result<Line, LineError>>;
}

impl<const N: usize> LineSource for Deque<Line, N> {
    fn next_line(&mut self) -> Option<Result<Line, LineError>> {
        self.pop_front().map(Ok)
    }
}

impl<const N: usize> LineSource for Deque<Result<Line, LineError>, N> {
    fn next_line(&mut self) -> Option<Result<Line, LineError>> {
        self.pop_front()
    }
}
