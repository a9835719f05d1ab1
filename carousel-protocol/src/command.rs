//! Operator commands
//!
//! A command line is a verb followed by at most [`MAX_ARGS`] signed integer
//! arguments. Parsing resolves the verb and argument count into a closed
//! [`Command`] enum, so every `(verb, arity)` pair the controller accepts is
//! spelled out here and matched exhaustively by the executor.

use heapless::Vec;

/// Maximum number of numeric arguments after the verb
pub const MAX_ARGS: usize = 2;

/// Errors that can occur while parsing a command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Line had no tokens
    Empty,
    /// Verb is not part of the protocol
    UnknownVerb,
    /// Verb is known but not with this many arguments
    BadArity,
    /// An argument was not a signed 32-bit integer
    BadNumber,
    /// More than [`MAX_ARGS`] arguments
    TooManyArgs,
}

/// Parsed operator command
///
/// Card ids are carried as raw integers; range checks against the card
/// registry happen at execution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// `pos`: report absolute position
    Position,
    /// `maxPulses [n]`: get/set pulses per revolution
    PulsesPerRev(Option<i32>),
    /// `limit [n]`: get/set revolution limit
    Limit(Option<i32>),
    /// `maxSpeed [n]`: get/set global speed ceiling
    MaxSpeed(Option<i32>),
    /// `speed <card> [n]`: get/set a card's running speed
    Speed { card: i32, speed: Option<i32> },
    /// `origin`: re-zero absolute position
    Origin,
    /// `move <n>`: relative displacement in pulses
    Move(i32),
    /// `goto <n>`: absolute displacement in pulses
    Goto(i32),
    /// `go`: start or resume revolutions
    Go,
    /// `halt`: freeze immediately
    Halt,
    /// `pause`: stop after the current revolution
    Pause,
    /// `stop`: stop after the current revolution and reset the counter
    Stop,
    /// `restart`: reset the counter and run
    Restart,
    /// `scantime <card> [ms]`: get/set dwell at the scan position
    ScanTime { card: i32, ms: Option<i32> },
    /// `offtime <card> [ms]`: get/set dwell at the rest position
    OffTime { card: i32, ms: Option<i32> },
    /// `status`: report a sequencer snapshot
    Status,
}

/// Verb keywords as they appear on the wire
const VERBS: &[&str] = &[
    "pos", "maxPulses", "limit", "maxSpeed", "speed", "origin", "move", "goto", "go", "halt",
    "pause", "stop", "restart", "scantime", "offtime", "status",
];

impl Command {
    /// Parse a command line
    ///
    /// Verbs match case-insensitively; surrounding and repeated whitespace is
    /// ignored.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let mut tokens = line.split_ascii_whitespace();
        let verb = tokens.next().ok_or(ParseError::Empty)?;

        let mut args = Vec::<i32, MAX_ARGS>::new();
        for token in tokens {
            // Only a leading `-` is part of the number syntax
            if token.starts_with('+') {
                return Err(ParseError::BadNumber);
            }
            let value = token.parse::<i32>().map_err(|_| ParseError::BadNumber)?;
            args.push(value).map_err(|_| ParseError::TooManyArgs)?;
        }

        let keyword = VERBS
            .iter()
            .copied()
            .find(|v| v.eq_ignore_ascii_case(verb))
            .ok_or(ParseError::UnknownVerb)?;

        Self::from_parts(keyword, &args)
    }

    fn from_parts(keyword: &str, args: &[i32]) -> Result<Self, ParseError> {
        use Command::*;

        let cmd = match (keyword, args) {
            ("pos", []) => Position,
            ("maxPulses", []) => PulsesPerRev(None),
            ("maxPulses", [n]) => PulsesPerRev(Some(*n)),
            ("limit", []) => Limit(None),
            ("limit", [n]) => Limit(Some(*n)),
            ("maxSpeed", []) => MaxSpeed(None),
            ("maxSpeed", [n]) => MaxSpeed(Some(*n)),
            ("speed", [card]) => Speed { card: *card, speed: None },
            ("speed", [card, n]) => Speed { card: *card, speed: Some(*n) },
            ("origin", []) => Origin,
            ("move", [n]) => Move(*n),
            ("goto", [n]) => Goto(*n),
            ("go", []) => Go,
            ("halt", []) => Halt,
            ("pause", []) => Pause,
            ("stop", []) => Stop,
            ("restart", []) => Restart,
            ("scantime", [card]) => ScanTime { card: *card, ms: None },
            ("scantime", [card, ms]) => ScanTime { card: *card, ms: Some(*ms) },
            ("offtime", [card]) => OffTime { card: *card, ms: None },
            ("offtime", [card, ms]) => OffTime { card: *card, ms: Some(*ms) },
            ("status", []) => Status,
            _ => return Err(ParseError::BadArity),
        };
        Ok(cmd)
    }

    /// Wire keyword for this command
    pub fn verb(&self) -> &'static str {
        match self {
            Command::Position => "pos",
            Command::PulsesPerRev(_) => "maxPulses",
            Command::Limit(_) => "limit",
            Command::MaxSpeed(_) => "maxSpeed",
            Command::Speed { .. } => "speed",
            Command::Origin => "origin",
            Command::Move(_) => "move",
            Command::Goto(_) => "goto",
            Command::Go => "go",
            Command::Halt => "halt",
            Command::Pause => "pause",
            Command::Stop => "stop",
            Command::Restart => "restart",
            Command::ScanTime { .. } => "scantime",
            Command::OffTime { .. } => "offtime",
            Command::Status => "status",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_bare_verbs() {
        assert_eq!(Command::parse("pos"), Ok(Command::Position));
        assert_eq!(Command::parse("origin"), Ok(Command::Origin));
        assert_eq!(Command::parse("go"), Ok(Command::Go));
        assert_eq!(Command::parse("halt"), Ok(Command::Halt));
        assert_eq!(Command::parse("pause"), Ok(Command::Pause));
        assert_eq!(Command::parse("stop"), Ok(Command::Stop));
        assert_eq!(Command::parse("restart"), Ok(Command::Restart));
        assert_eq!(Command::parse("status"), Ok(Command::Status));
    }

    #[test]
    fn test_getter_and_setter_arity() {
        assert_eq!(Command::parse("limit"), Ok(Command::Limit(None)));
        assert_eq!(Command::parse("limit 3"), Ok(Command::Limit(Some(3))));
        assert_eq!(Command::parse("maxPulses 3200"), Ok(Command::PulsesPerRev(Some(3200))));
        assert_eq!(
            Command::parse("speed 2"),
            Ok(Command::Speed { card: 2, speed: None })
        );
        assert_eq!(
            Command::parse("speed 2 5000"),
            Ok(Command::Speed { card: 2, speed: Some(5000) })
        );
        assert_eq!(
            Command::parse("scantime 1 2500"),
            Ok(Command::ScanTime { card: 1, ms: Some(2500) })
        );
        assert_eq!(
            Command::parse("offtime 4"),
            Ok(Command::OffTime { card: 4, ms: None })
        );
    }

    #[test]
    fn test_negative_arguments() {
        assert_eq!(Command::parse("move -200"), Ok(Command::Move(-200)));
        assert_eq!(
            Command::parse("speed 1 -400"),
            Ok(Command::Speed { card: 1, speed: Some(-400) })
        );
    }

    #[test]
    fn test_plus_sign_rejected() {
        assert_eq!(Command::parse("move +5"), Err(ParseError::BadNumber));
        assert_eq!(Command::parse("speed +1 400"), Err(ParseError::BadNumber));
        assert_eq!(Command::parse("limit 3+"), Err(ParseError::BadNumber));
    }

    #[test]
    fn test_whitespace_and_case() {
        assert_eq!(Command::parse("  GOTO   800  "), Ok(Command::Goto(800)));
        assert_eq!(Command::parse("maxspeed\t1200"), Ok(Command::MaxSpeed(Some(1200))));
        assert_eq!(Command::parse("ScanTime 3"), Ok(Command::ScanTime { card: 3, ms: None }));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Command::parse(""), Err(ParseError::Empty));
        assert_eq!(Command::parse("   "), Err(ParseError::Empty));
        assert_eq!(Command::parse("spin"), Err(ParseError::UnknownVerb));
        assert_eq!(Command::parse("go 1"), Err(ParseError::BadArity));
        assert_eq!(Command::parse("move"), Err(ParseError::BadArity));
        assert_eq!(Command::parse("speed"), Err(ParseError::BadArity));
        assert_eq!(Command::parse("goto 1 2"), Err(ParseError::BadArity));
        assert_eq!(Command::parse("move ten"), Err(ParseError::BadNumber));
        assert_eq!(Command::parse("move 99999999999"), Err(ParseError::BadNumber));
        assert_eq!(Command::parse("speed 1 2 3"), Err(ParseError::TooManyArgs));
    }

    #[test]
    fn test_verb_roundtrips_through_parser() {
        let commands = [
            Command::Position,
            Command::Origin,
            Command::Go,
            Command::Halt,
            Command::Pause,
            Command::Stop,
            Command::Restart,
            Command::Status,
            Command::Limit(None),
            Command::MaxSpeed(None),
            Command::PulsesPerRev(None),
        ];
        for cmd in commands {
            assert_eq!(Command::parse(cmd.verb()), Ok(cmd));
        }
    }

    proptest! {
        #[test]
        fn prop_move_accepts_any_i32(n in any::<i32>()) {
            let mut line = heapless::String::<32>::new();
            core::fmt::Write::write_fmt(&mut line, format_args!("move {}", n)).unwrap();
            prop_assert_eq!(Command::parse(&line), Ok(Command::Move(n)));
        }

        #[test]
        fn prop_parse_never_panics(s in "[ -~]{0,32}") {
            let _ = Command::parse(&s);
        }
    }
}
