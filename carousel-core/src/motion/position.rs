//! Position to card mapping
//!
//! The active card is tracked incrementally while the motor steps: each new
//! position is compared against the current card's band and the id moves to
//! the neighbouring card when the band is left. Discontinuous changes
//! (re-zeroing, normalization, a new revolution length) resynchronize with a
//! direct lookup instead.

use crate::cards::{CardId, CardRegistry};

/// Fold an absolute position into `[0, pulses_per_rev)`
///
/// Floored modulo: `-1` maps to `pulses_per_rev - 1`, never `-1`.
pub fn normalize(position: i32, pulses_per_rev: i32) -> i32 {
    position.rem_euclid(pulses_per_rev)
}

/// Tracks which card is over the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PositionMapper {
    current: CardId,
}

impl PositionMapper {
    /// Create a mapper synchronized to `position`
    pub fn new(registry: &CardRegistry, position: i32) -> Self {
        Self {
            current: Self::card_for_position(registry, position),
        }
    }

    /// Card currently over the sensor
    pub fn current(&self) -> CardId {
        self.current
    }

    /// Direct lookup of the card owning `position`
    pub fn card_for_position(registry: &CardRegistry, position: i32) -> CardId {
        let pos = normalize(position, registry.pulses_per_rev());
        let index = (pos / registry.band_width()) as usize;
        CardId::from_index(index).unwrap_or(CardId::LAST)
    }

    /// Follow a single emitted step
    ///
    /// Returns the new card when the step crossed a band boundary.
    pub fn track(&mut self, registry: &CardRegistry, position: i32) -> Option<CardId> {
        let pos = normalize(position, registry.pulses_per_rev());
        if registry.get(self.current).contains(pos) {
            return None;
        }

        let next = self.current.next();
        let prev = self.current.prev();
        self.current = if registry.get(next).contains(pos) {
            next
        } else if registry.get(prev).contains(pos) {
            prev
        } else {
            // More than one band in a single update
            Self::card_for_position(registry, position)
        };
        Some(self.current)
    }

    /// Resynchronize after a discontinuous position change
    pub fn resync(&mut self, registry: &CardRegistry, position: i32) {
        self.current = Self::card_for_position(registry, position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CarouselConfig;
    use proptest::prelude::*;

    fn registry() -> CardRegistry {
        CardRegistry::new(&CarouselConfig::default())
    }

    fn card(id: i32) -> CardId {
        CardId::new(id).unwrap()
    }

    #[test]
    fn test_normalize_floored() {
        assert_eq!(normalize(-1, 1600), 1599);
        assert_eq!(normalize(1600, 1600), 0);
        assert_eq!(normalize(1601, 1600), 1);
        assert_eq!(normalize(-1600, 1600), 0);
        assert_eq!(normalize(-3201, 1600), 1599);
        assert_eq!(normalize(799, 1600), 799);
    }

    #[test]
    fn test_direct_lookup() {
        let reg = registry();
        assert_eq!(PositionMapper::card_for_position(&reg, 0), card(1));
        assert_eq!(PositionMapper::card_for_position(&reg, 399), card(1));
        assert_eq!(PositionMapper::card_for_position(&reg, 400), card(2));
        assert_eq!(PositionMapper::card_for_position(&reg, 1599), card(4));
        assert_eq!(PositionMapper::card_for_position(&reg, -1), card(4));
        assert_eq!(PositionMapper::card_for_position(&reg, 1600), card(1));
    }

    #[test]
    fn test_track_forward_across_bands() {
        let reg = registry();
        let mut mapper = PositionMapper::new(&reg, 398);
        assert_eq!(mapper.track(&reg, 399), None);
        assert_eq!(mapper.track(&reg, 400), Some(card(2)));
        assert_eq!(mapper.current(), card(2));
    }

    #[test]
    fn test_track_wraps_forward() {
        let reg = registry();
        let mut mapper = PositionMapper::new(&reg, 1599);
        assert_eq!(mapper.current(), card(4));
        assert_eq!(mapper.track(&reg, 1600), Some(card(1)));
    }

    #[test]
    fn test_track_wraps_backward() {
        let reg = registry();
        let mut mapper = PositionMapper::new(&reg, 0);
        assert_eq!(mapper.track(&reg, -1), Some(card(4)));
        assert_eq!(mapper.track(&reg, -2), None);
        assert_eq!(mapper.current(), card(4));
    }

    #[test]
    fn test_track_recovers_from_jump() {
        let reg = registry();
        let mut mapper = PositionMapper::new(&reg, 0);
        assert_eq!(mapper.track(&reg, 1000), Some(card(3)));
    }

    #[test]
    fn test_resync() {
        let reg = registry();
        let mut mapper = PositionMapper::new(&reg, 1300);
        mapper.resync(&reg, 0);
        assert_eq!(mapper.current(), card(1));
    }

    proptest! {
        #[test]
        fn prop_normalize_in_range(pos in any::<i32>(), eighths in 1i32..4096) {
            let pulses = eighths * 8;
            let n = normalize(pos, pulses);
            prop_assert!(n >= 0 && n < pulses);
            prop_assert_eq!((n as i64 - pos as i64).rem_euclid(pulses as i64), 0);
        }

        #[test]
        fn prop_stepwise_tracking_matches_lookup(start in -5000i32..5000, steps in -3000i32..3000) {
            let reg = registry();
            let mut mapper = PositionMapper::new(&reg, start);
            let dir = steps.signum();
            let mut pos = start;
            for _ in 0..steps.abs() {
                pos += dir;
                mapper.track(&reg, pos);
                prop_assert_eq!(mapper.current(), PositionMapper::card_for_position(&reg, pos));
            }
        }
    }
}
