//! Run mode definition

use carousel_protocol::{LineError, ParseError};

/// Sequencer run modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Power-on state, or a run finished at its revolution limit
    #[default]
    Idle,
    /// Revolutions are being started while under the limit
    Running,
    /// Frozen mid-motion; the active card's speed is parked
    Halted,
    /// Graceful stop after a revolution, counter kept
    Paused,
    /// Graceful stop after a revolution, counter reset
    Stopped,
}

/// Graceful stop requested while a revolution is still in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WindDown {
    /// Enter [`Mode::Paused`] when the revolution completes
    Pause,
    /// Enter [`Mode::Stopped`] and reset the counter when the revolution completes
    Stop,
}

impl WindDown {
    /// Mode entered once the wind-down applies
    pub fn target_mode(self) -> Mode {
        match self {
            WindDown::Pause => Mode::Paused,
            WindDown::Stop => Mode::Stopped,
        }
    }
}

/// Errors reported for rejected operator commands
///
/// Every error leaves sequencer state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// Unparseable line, unknown verb/arity, or unusable value
    InvalidCommand,
    /// Card number outside `1..=CARD_COUNT`
    InvalidCardId,
    /// Absolute target outside `[0, pulses_per_rev]`
    OutOfBounds,
    /// Operation needs the carousel to be still
    AlreadyRunning,
    /// `halt` while already halted
    AlreadyHalted,
    /// `pause`/`stop` while neither running nor halted
    AlreadyStopped,
    /// `go` with the revolution counter at its limit
    LimitReached,
}

impl CommandError {
    /// Operator-facing description
    pub fn message(self) -> &'static str {
        match self {
            CommandError::InvalidCommand => "invalid command",
            CommandError::InvalidCardId => "invalid card id",
            CommandError::OutOfBounds => "target out of bounds",
            CommandError::AlreadyRunning => "already running",
            CommandError::AlreadyHalted => "already halted",
            CommandError::AlreadyStopped => "already stopped",
            CommandError::LimitReached => "revolution limit reached, use restart",
        }
    }
}

impl From<ParseError> for CommandError {
    fn from(_: ParseError) -> Self {
        CommandError::InvalidCommand
    }
}

impl From<LineError> for CommandError {
    fn from(_: LineError) -> Self {
        CommandError::InvalidCommand
    }
}

impl Mode {
    /// Check if new revolutions may start
    pub fn is_running(&self) -> bool {
        matches!(self, Mode::Running)
    }

    /// Check if the carousel is frozen by `halt`
    pub fn is_halted(&self) -> bool {
        matches!(self, Mode::Halted)
    }

    /// Check if the carousel is at rest and accepts manual moves
    pub fn is_at_rest(&self) -> bool {
        !self.is_running()
    }

    /// Validate `halt`
    pub fn check_halt(self) -> Result<(), CommandError> {
        if self.is_halted() {
            Err(CommandError::AlreadyHalted)
        } else {
            Ok(())
        }
    }

    /// Validate `pause` / `stop`
    pub fn check_wind_down(self) -> Result<(), CommandError> {
        if self.is_running() || self.is_halted() {
            Ok(())
        } else {
            Err(CommandError::AlreadyStopped)
        }
    }

    /// Status keyword reported to the operator
    pub fn label(self) -> &'static str {
        match self {
            Mode::Idle => "idle",
            Mode::Running => "running",
            Mode::Halted => "halted",
            Mode::Paused => "paused",
            Mode::Stopped => "stopped",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        assert_eq!(Mode::default(), Mode::Idle);
    }

    #[test]
    fn test_halt_validation() {
        assert_eq!(Mode::Halted.check_halt(), Err(CommandError::AlreadyHalted));
        for mode in [Mode::Idle, Mode::Running, Mode::Paused, Mode::Stopped] {
            assert_eq!(mode.check_halt(), Ok(()));
        }
    }

    #[test]
    fn test_wind_down_validation() {
        assert_eq!(Mode::Running.check_wind_down(), Ok(()));
        assert_eq!(Mode::Halted.check_wind_down(), Ok(()));
        for mode in [Mode::Idle, Mode::Paused, Mode::Stopped] {
            assert_eq!(mode.check_wind_down(), Err(CommandError::AlreadyStopped));
        }
    }

    #[test]
    fn test_wind_down_targets() {
        assert_eq!(WindDown::Pause.target_mode(), Mode::Paused);
        assert_eq!(WindDown::Stop.target_mode(), Mode::Stopped);
    }

    #[test]
    fn test_only_running_blocks_manual_moves() {
        assert!(!Mode::Running.is_at_rest());
        assert!(Mode::Halted.is_at_rest());
        assert!(Mode::Paused.is_at_rest());
    }

    #[test]
    fn test_protocol_errors_map_to_invalid_command() {
        assert_eq!(
            CommandError::from(ParseError::UnknownVerb),
            CommandError::InvalidCommand
        );
        assert_eq!(
            CommandError::from(LineError::TooLong),
            CommandError::InvalidCommand
        );
    }
}
