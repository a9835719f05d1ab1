//! Operator responses
//!
//! Every reply is one line prefixed with a category tag:
//!
//! - `GET:` value read back by a query
//! - `UPDATE:` value after a setter (clamped values are echoed as stored)
//! - `STATUS:` mode changes and progress notices
//! - `ERROR:` rejected command, state unchanged
//! - `DISPLACE:` manual move finished
//!
//! The wording is for humans; the tag and the echoed values with their units
//! are what a terminal script should rely on.

use core::fmt::{self, Write};

use heapless::String;

use crate::cards::CardId;
use crate::state::{CommandError, Mode, WindDown};

/// Longest formatted response line
pub const MAX_RESPONSE_LEN: usize = 80;

/// A value read from or written to the sequencer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reading {
    /// Absolute position in pulses
    Position(i32),
    /// Pulses per revolution
    PulsesPerRev(i32),
    /// Revolution limit
    Limit(u32),
    /// Global speed ceiling
    MaxSpeed(i32),
    /// A card's running speed
    Speed { card: CardId, speed: i32 },
    /// A card's scan dwell
    ScanTime { card: CardId, ms: u32 },
    /// A card's rest dwell
    OffTime { card: CardId, ms: u32 },
    /// Full sequencer snapshot
    Snapshot(Snapshot),
}

/// Sequencer state summary for `status`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Snapshot {
    pub mode: Mode,
    pub rev_num: u32,
    pub rev_limit: u32,
    pub task_index: usize,
    pub card: CardId,
    pub position: i32,
}

/// Unsolicited or mode-change notices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Notice {
    /// Run mode changed
    Mode(Mode),
    /// Graceful stop accepted, applies when the revolution completes
    WindDownPending(WindDown),
    /// A revolution started
    Revolution { num: u32, limit: u32 },
    /// The revolution limit was reached
    RunComplete { limit: u32 },
    /// Counter reset and settle delay armed
    Restarted { settle_ms: u64 },
    /// Requested speed exceeded the ceiling and was clamped
    SpeedClamped { card: CardId, requested: i32, ceiling: i32 },
    /// A new ceiling clamped this many cards
    SpeedsClamped { count: usize, ceiling: i32 },
    /// Position re-zeroed
    Origin,
}

/// One response line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Response {
    Get(Reading),
    Update(Reading),
    Status(Notice),
    Error(CommandError),
    Displace { position: i32 },
}

impl Response {
    /// Category tag, without the colon
    pub fn tag(&self) -> &'static str {
        match self {
            Response::Get(_) => "GET",
            Response::Update(_) => "UPDATE",
            Response::Status(_) => "STATUS",
            Response::Error(_) => "ERROR",
            Response::Displace { .. } => "DISPLACE",
        }
    }

    /// Format into a fixed-capacity line (no terminator)
    ///
    /// Output longer than [`MAX_RESPONSE_LEN`] is cut short.
    pub fn to_line(&self) -> String<MAX_RESPONSE_LEN> {
        let mut line = String::new();
        let _ = write!(line, "{}", self);
        line
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Position(p) => write!(f, "position {} pulses", p),
            Reading::PulsesPerRev(p) => write!(f, "maxPulses {} pulses/rev", p),
            Reading::Limit(n) => write!(f, "limit {} revolutions", n),
            Reading::MaxSpeed(s) => write!(f, "maxSpeed {} pulses/s", s),
            Reading::Speed { card, speed } => write!(f, "card {} speed {} pulses/s", card, speed),
            Reading::ScanTime { card, ms } => write!(f, "card {} scantime {} ms", card, ms),
            Reading::OffTime { card, ms } => write!(f, "card {} offtime {} ms", card, ms),
            Reading::Snapshot(s) => write!(
                f,
                "{} rev {}/{} task {} card {} pos {}",
                s.mode.label(),
                s.rev_num,
                s.rev_limit,
                s.task_index,
                s.card,
                s.position
            ),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Mode(mode) => f.write_str(mode.label()),
            Notice::WindDownPending(WindDown::Pause) => f.write_str("pausing after revolution"),
            Notice::WindDownPending(WindDown::Stop) => f.write_str("stopping after revolution"),
            Notice::Revolution { num, limit } => write!(f, "revolution {} of {}", num, limit),
            Notice::RunComplete { limit } => write!(f, "completed {} revolutions", limit),
            Notice::Restarted { settle_ms } => write!(f, "restarted, settling {} ms", settle_ms),
            Notice::SpeedClamped {
                card,
                requested,
                ceiling,
            } => write!(
                f,
                "card {} speed {} exceeds maxSpeed, clamped to {} pulses/s",
                card, requested, ceiling
            ),
            Notice::SpeedsClamped { count, ceiling } => {
                write!(f, "{} card speeds clamped to {} pulses/s", count, ceiling)
            }
            Notice::Origin => f.write_str("origin set"),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.tag())?;
        match self {
            Response::Get(r) | Response::Update(r) => write!(f, "{}", r),
            Response::Status(n) => write!(f, "{}", n),
            Response::Error(e) => f.write_str(e.message()),
            Response::Displace { position } => write!(f, "moved to {} pulses", position),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(id: i32) -> CardId {
        CardId::new(id).unwrap()
    }

    #[test]
    fn test_tags() {
        assert_eq!(Response::Get(Reading::Position(0)).tag(), "GET");
        assert_eq!(Response::Update(Reading::Limit(3)).tag(), "UPDATE");
        assert_eq!(Response::Status(Notice::Origin).tag(), "STATUS");
        assert_eq!(Response::Error(CommandError::LimitReached).tag(), "ERROR");
        assert_eq!(Response::Displace { position: 1 }.tag(), "DISPLACE");
    }

    #[test]
    fn test_update_echoes_value_and_unit() {
        let line = Response::Update(Reading::Speed {
            card: card(2),
            speed: 1600,
        })
        .to_line();
        assert_eq!(line.as_str(), "UPDATE: card 2 speed 1600 pulses/s");
    }

    #[test]
    fn test_get_dwell() {
        let line = Response::Get(Reading::ScanTime {
            card: card(1),
            ms: 2500,
        })
        .to_line();
        assert_eq!(line.as_str(), "GET: card 1 scantime 2500 ms");
    }

    #[test]
    fn test_error_line() {
        let line = Response::Error(CommandError::AlreadyHalted).to_line();
        assert_eq!(line.as_str(), "ERROR: already halted");
    }

    #[test]
    fn test_status_lines() {
        let line = Response::Status(Notice::Revolution { num: 2, limit: 3 }).to_line();
        assert_eq!(line.as_str(), "STATUS: revolution 2 of 3");

        let line = Response::Status(Notice::Mode(Mode::Halted)).to_line();
        assert_eq!(line.as_str(), "STATUS: halted");
    }

    #[test]
    fn test_displace_line() {
        let line = Response::Displace { position: 1599 }.to_line();
        assert_eq!(line.as_str(), "DISPLACE: moved to 1599 pulses");
    }

    #[test]
    fn test_snapshot_fits_line() {
        let line = Response::Get(Reading::Snapshot(Snapshot {
            mode: Mode::Running,
            rev_num: u32::MAX,
            rev_limit: u32::MAX,
            task_index: 7,
            card: card(4),
            position: i32::MIN,
        }))
        .to_line();
        assert!(line.starts_with("GET: running rev 4294967295/4294967295"));
        assert!(line.ends_with("pos -2147483648"));
    }
}
