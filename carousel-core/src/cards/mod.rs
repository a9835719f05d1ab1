//! Card registry
//!
//! Each carousel arm carries one card. A card owns its running speed, its two
//! dwell times and the angular band it occupies over one revolution. The
//! bands partition `[0, pulses_per_rev)` into four contiguous quarters in
//! card order.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::{CardConfig, CarouselConfig};

/// Number of carousel arms
pub const CARD_COUNT: usize = 4;

/// 1-based card identifier, always in `1..=CARD_COUNT`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CardId(u8);

impl CardId {
    /// The card whose band starts at position 0
    pub const FIRST: CardId = CardId(1);

    /// The card whose band ends at the last pulse of the revolution
    pub const LAST: CardId = CardId(CARD_COUNT as u8);

    /// Validate an operator-supplied card number
    pub fn new(id: i32) -> Option<Self> {
        if (1..=CARD_COUNT as i32).contains(&id) {
            Some(CardId(id as u8))
        } else {
            None
        }
    }

    /// Card at a 0-based table index
    pub fn from_index(index: usize) -> Option<Self> {
        if index < CARD_COUNT {
            Some(CardId(index as u8 + 1))
        } else {
            None
        }
    }

    /// 1-based card number
    pub fn get(self) -> u8 {
        self.0
    }

    /// 0-based table index
    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    /// Next card in rotation order, wrapping 4 → 1
    pub fn next(self) -> Self {
        if self == Self::LAST {
            Self::FIRST
        } else {
            CardId(self.0 + 1)
        }
    }

    /// Previous card in rotation order, wrapping 1 → 4
    pub fn prev(self) -> Self {
        if self == Self::FIRST {
            Self::LAST
        } else {
            CardId(self.0 - 1)
        }
    }

    /// All cards in rotation order
    pub fn all() -> impl Iterator<Item = CardId> {
        (1..=CARD_COUNT as u8).map(CardId)
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One carousel arm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Card {
    /// Running speed in pulses/s (0 = frozen)
    pub running_speed: i32,
    /// Dwell after reaching the scan position (ms)
    pub scan_time_ms: u32,
    /// Dwell after reaching the rest position (ms)
    pub off_time_ms: u32,
    /// First pulse of this card's band (inclusive)
    pub min_pos: i32,
    /// Last pulse of this card's band (inclusive)
    pub max_pos: i32,
}

impl Card {
    /// Check whether a normalized position falls in this card's band
    pub fn contains(&self, position: i32) -> bool {
        position >= self.min_pos && position <= self.max_pos
    }

    /// Band bounds for a card at `index` (0-based)
    fn band(index: usize, pulses_per_rev: i32) -> (i32, i32) {
        let width = pulses_per_rev / CARD_COUNT as i32;
        let max_pos = (index as i32 + 1) * width - 1;
        (max_pos - width + 1, max_pos)
    }
}

/// Fixed table of the four cards
#[derive(Debug, Clone)]
pub struct CardRegistry {
    cards: [Card; CARD_COUNT],
    pulses_per_rev: i32,
}

impl CardRegistry {
    /// Build the registry from configuration defaults
    pub fn new(config: &CarouselConfig) -> Self {
        let mut registry = Self {
            cards: config.cards.map(|c: CardConfig| Card {
                running_speed: c.running_speed,
                scan_time_ms: c.scan_time_ms,
                off_time_ms: c.off_time_ms,
                min_pos: 0,
                max_pos: 0,
            }),
            pulses_per_rev: config.pulses_per_rev,
        };
        registry.set_pulses_per_rev(config.pulses_per_rev);
        registry
    }

    /// Pulses for one full revolution
    pub fn pulses_per_rev(&self) -> i32 {
        self.pulses_per_rev
    }

    /// Width of one card band in pulses
    pub fn band_width(&self) -> i32 {
        self.pulses_per_rev / CARD_COUNT as i32
    }

    /// Re-partition the revolution into card bands
    ///
    /// Callers validate `pulses_per_rev` first (see
    /// [`CarouselConfig::is_valid_pulses_per_rev`]).
    pub fn set_pulses_per_rev(&mut self, pulses_per_rev: i32) {
        self.pulses_per_rev = pulses_per_rev;
        for (i, card) in self.cards.iter_mut().enumerate() {
            let (min_pos, max_pos) = Card::band(i, pulses_per_rev);
            card.min_pos = min_pos;
            card.max_pos = max_pos;
        }
    }

    /// Look up a card
    pub fn get(&self, id: CardId) -> &Card {
        &self.cards[id.index()]
    }

    /// Look up a card for mutation
    pub fn get_mut(&mut self, id: CardId) -> &mut Card {
        &mut self.cards[id.index()]
    }

    /// Iterate cards with their ids, in rotation order
    pub fn iter(&self) -> impl Iterator<Item = (CardId, &Card)> {
        CardId::all().zip(self.cards.iter())
    }

    /// Clamp every card speed to `±ceiling`
    ///
    /// Returns the number of cards that changed.
    pub fn clamp_speeds(&mut self, ceiling: i32) -> usize {
        let mut clamped = 0;
        for card in self.cards.iter_mut() {
            let limited = card.running_speed.clamp(-ceiling, ceiling);
            if limited != card.running_speed {
                card.running_speed = limited;
                clamped += 1;
            }
        }
        clamped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn registry(pulses_per_rev: i32) -> CardRegistry {
        CardRegistry::new(&CarouselConfig {
            pulses_per_rev,
            ..Default::default()
        })
    }

    #[test]
    fn test_card_id_bounds() {
        assert_eq!(CardId::new(0), None);
        assert_eq!(CardId::new(5), None);
        assert_eq!(CardId::new(-1), None);
        assert_eq!(CardId::new(1), Some(CardId::FIRST));
        assert_eq!(CardId::new(4), Some(CardId::LAST));
        assert_eq!(CardId::from_index(3), Some(CardId::LAST));
        assert_eq!(CardId::from_index(4), None);
    }

    #[test]
    fn test_card_id_wraps() {
        assert_eq!(CardId::LAST.next(), CardId::FIRST);
        assert_eq!(CardId::FIRST.prev(), CardId::LAST);
        assert_eq!(CardId::FIRST.next().get(), 2);
        assert_eq!(CardId::all().count(), CARD_COUNT);
    }

    #[test]
    fn test_default_bands() {
        let reg = registry(1600);
        let bands: heapless::Vec<(i32, i32), CARD_COUNT> =
            reg.iter().map(|(_, c)| (c.min_pos, c.max_pos)).collect();
        assert_eq!(
            bands.as_slice(),
            &[(0, 399), (400, 799), (800, 1199), (1200, 1599)]
        );
    }

    #[test]
    fn test_band_invariant() {
        let reg = registry(3200);
        for (_, card) in reg.iter() {
            assert_eq!(card.min_pos, card.max_pos - reg.pulses_per_rev() / 4 + 1);
        }
    }

    #[test]
    fn test_rebuild_bands() {
        let mut reg = registry(1600);
        reg.set_pulses_per_rev(800);
        assert_eq!(reg.band_width(), 200);
        assert_eq!(reg.get(CardId::LAST).max_pos, 799);
        assert_eq!(reg.get(CardId::LAST).min_pos, 600);
    }

    #[test]
    fn test_clamp_speeds() {
        let mut reg = registry(1600);
        reg.get_mut(CardId::FIRST).running_speed = 2000;
        reg.get_mut(CardId::LAST).running_speed = -3000;
        assert_eq!(reg.clamp_speeds(1000), 2);
        assert_eq!(reg.get(CardId::FIRST).running_speed, 1000);
        assert_eq!(reg.get(CardId::LAST).running_speed, -1000);
        assert_eq!(reg.get(CardId::new(2).unwrap()).running_speed, 800);
    }

    proptest! {
        #[test]
        fn prop_bands_partition_revolution(eighths in 1i32..2048) {
            let pulses = eighths * 8;
            let reg = registry(pulses);

            // Every pulse belongs to exactly one band
            let mut expected_start = 0;
            for (_, card) in reg.iter() {
                prop_assert_eq!(card.min_pos, expected_start);
                prop_assert!(card.max_pos >= card.min_pos);
                expected_start = card.max_pos + 1;
            }
            prop_assert_eq!(expected_start, pulses);

            for pos in [0, pulses / 2, pulses - 1] {
                let owners = reg.iter().filter(|(_, c)| c.contains(pos)).count();
                prop_assert_eq!(owners, 1);
            }
        }
    }
}
