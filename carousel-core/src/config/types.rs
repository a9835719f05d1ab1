//! Configuration type definitions

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::cards::CARD_COUNT;

/// Default pulses per carousel revolution
pub const DEFAULT_PULSES_PER_REV: i32 = 1600;

/// Default number of revolutions before the sequence completes
pub const DEFAULT_REV_LIMIT: u32 = 10;

/// Default global speed ceiling (pulses/s)
pub const DEFAULT_MAX_SPEED: i32 = 1600;

/// Default running speed for each card (pulses/s)
pub const DEFAULT_CARD_SPEED: i32 = 800;

/// Default dwell at the scan position (ms)
pub const DEFAULT_SCAN_TIME_MS: u32 = 2000;

/// Default dwell at the rest position (ms)
pub const DEFAULT_OFF_TIME_MS: u32 = 1000;

/// Grace period after `restart` or a completed run (ms)
pub const SETTLE_DELAY_MS: u64 = 2000;

/// Pulses per revolution must divide into eighths
pub const PULSES_PER_REV_GRANULARITY: i32 = 8;

/// Per-card tunables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CardConfig {
    /// Running speed in pulses/s (0 = frozen)
    pub running_speed: i32,
    /// Dwell after reaching the scan position (ms)
    pub scan_time_ms: u32,
    /// Dwell after reaching the rest position (ms)
    pub off_time_ms: u32,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            running_speed: DEFAULT_CARD_SPEED,
            scan_time_ms: DEFAULT_SCAN_TIME_MS,
            off_time_ms: DEFAULT_OFF_TIME_MS,
        }
    }
}

/// Machine-wide configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CarouselConfig {
    /// Pulses for one full carousel revolution
    pub pulses_per_rev: i32,
    /// Revolutions per run
    pub rev_limit: u32,
    /// Global speed ceiling (pulses/s)
    pub max_speed: i32,
    /// Settle delay after restart / run completion (ms)
    pub settle_ms: u64,
    /// Per-card tunables, in carousel order
    pub cards: [CardConfig; CARD_COUNT],
}

impl Default for CarouselConfig {
    fn default() -> Self {
        Self {
            pulses_per_rev: DEFAULT_PULSES_PER_REV,
            rev_limit: DEFAULT_REV_LIMIT,
            max_speed: DEFAULT_MAX_SPEED,
            settle_ms: SETTLE_DELAY_MS,
            cards: [CardConfig::default(); CARD_COUNT],
        }
    }
}

impl CarouselConfig {
    /// Check whether a pulses-per-revolution value is usable
    ///
    /// Bands are quarter revolutions and scan targets sit an eighth before
    /// each band's end, so the value must be a positive multiple of eight.
    pub fn is_valid_pulses_per_rev(pulses: i32) -> bool {
        pulses > 0 && pulses % PULSES_PER_REV_GRANULARITY == 0
    }

    /// Check the whole configuration
    pub fn is_valid(&self) -> bool {
        Self::is_valid_pulses_per_rev(self.pulses_per_rev)
            && self.max_speed > 0
            && self
                .cards
                .iter()
                .all(|c| c.running_speed.unsigned_abs() <= self.max_speed as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = CarouselConfig::default();
        assert!(config.is_valid());
        assert_eq!(config.pulses_per_rev, 1600);
        assert_eq!(config.cards.len(), CARD_COUNT);
    }

    #[test]
    fn test_pulses_per_rev_validation() {
        assert!(CarouselConfig::is_valid_pulses_per_rev(8));
        assert!(CarouselConfig::is_valid_pulses_per_rev(3200));
        assert!(!CarouselConfig::is_valid_pulses_per_rev(0));
        assert!(!CarouselConfig::is_valid_pulses_per_rev(-1600));
        assert!(!CarouselConfig::is_valid_pulses_per_rev(1604));
    }

    #[test]
    fn test_card_speed_above_ceiling_is_invalid() {
        let mut config = CarouselConfig::default();
        config.cards[2].running_speed = config.max_speed + 1;
        assert!(!config.is_valid());

        config.cards[2].running_speed = -config.max_speed;
        assert!(config.is_valid());
    }
}
