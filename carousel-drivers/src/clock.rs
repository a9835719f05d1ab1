//! Time sources for step scheduling

use core::time::Duration;

/// Something which records elapsed real time
///
/// Takes `&self` so one clock can be shared between drivers.
pub trait SystemClock {
    /// Time since a clock-specific reference point (e.g. boot)
    fn elapsed(&self) -> Duration;
}

impl<C: SystemClock> SystemClock for &C {
    fn elapsed(&self) -> Duration {
        (*self).elapsed()
    }
}
