//! Step/direction stepper driver
//!
//! Drives any external stepper driver chip (A4988, DRV8825, TMC2209 in
//! standalone mode, ...) through two GPIO lines: a direction level and a
//! rising edge per microstep.
//!
//! Steps are paced by a [`SystemClock`]: each poll compares the time since
//! the last pulse against the interval for the current speed, so the caller
//! can spin as fast as it likes without sleeping.
//!
//! ```ignore
//! let mut stepper = StepDirStepper::new(step_pin, dir_pin, clock, StepDirConfig::default());
//! stepper.set_max_speed(1600);
//! stepper.move_to(400);
//! stepper.set_speed(800);
//! while stepper.distance_to_go() != 0 {
//!     stepper.run_speed_to_position()?;
//! }
//! ```

use core::time::Duration;

use carousel_core::traits::{StepperDriver, StepperError};
use embedded_hal::digital::OutputPin;

use crate::clock::SystemClock;

/// Step/direction driver configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct StepDirConfig {
    /// Drive DIR low for positive steps instead of high
    pub invert_dir: bool,
}

/// Stepper driven through STEP and DIR output pins
pub struct StepDirStepper<STEP, DIR, C> {
    step: STEP,
    dir: DIR,
    clock: C,
    config: StepDirConfig,
    /// Absolute position in steps
    position: i32,
    /// Absolute target in steps
    target: i32,
    /// Signed running speed (steps/s)
    speed: i32,
    /// Speed ceiling (steps/s)
    max_speed: i32,
    /// Time between pulses at the current speed; zero means stopped
    step_interval: Duration,
    /// Clock reading at the last pulse
    last_step: Duration,
    /// Level last written to DIR, as "moving forward"
    forward: Option<bool>,
}

impl<STEP, DIR, C> StepDirStepper<STEP, DIR, C>
where
    STEP: OutputPin,
    DIR: OutputPin,
    C: SystemClock,
{
    /// Create a stopped driver at position 0
    pub fn new(step: STEP, dir: DIR, clock: C, config: StepDirConfig) -> Self {
        Self {
            step,
            dir,
            clock,
            config,
            position: 0,
            target: 0,
            speed: 0,
            max_speed: 1,
            step_interval: Duration::ZERO,
            last_step: Duration::ZERO,
            forward: None,
        }
    }

    /// Release the pins and clock
    pub fn into_inner(self) -> (STEP, DIR, C) {
        (self.step, self.dir, self.clock)
    }

    /// Time between pulses at the current speed
    pub fn step_interval(&self) -> Duration {
        self.step_interval
    }

    fn set_direction(&mut self, forward: bool) -> Result<(), StepperError> {
        if self.forward == Some(forward) {
            return Ok(());
        }

        let high = forward != self.config.invert_dir;
        let result = if high {
            self.dir.set_high()
        } else {
            self.dir.set_low()
        };
        result.map_err(|_| StepperError::PinFault)?;
        self.forward = Some(forward);
        Ok(())
    }

    /// Emit one pulse if the step interval has elapsed
    fn poll(&mut self, forward: bool) -> Result<bool, StepperError> {
        if self.step_interval.is_zero() {
            return Ok(false);
        }

        let now = self.clock.elapsed();
        if now.saturating_sub(self.last_step) < self.step_interval {
            return Ok(false);
        }

        self.set_direction(forward)?;
        self.step.set_high().map_err(|_| StepperError::PinFault)?;
        self.step.set_low().map_err(|_| StepperError::PinFault)?;

        // A failed pulse leaves the position untouched
        self.position += if forward { 1 } else { -1 };
        self.last_step = now;
        Ok(true)
    }
}

impl<STEP, DIR, C> StepperDriver for StepDirStepper<STEP, DIR, C>
where
    STEP: OutputPin,
    DIR: OutputPin,
    C: SystemClock,
{
    fn set_max_speed(&mut self, speed: i32) {
        self.max_speed = speed.saturating_abs().max(1);
        self.set_speed(self.speed);
    }

    fn set_speed(&mut self, speed: i32) {
        let speed = speed.clamp(-self.max_speed, self.max_speed);
        self.step_interval = match speed.unsigned_abs() {
            0 => Duration::ZERO,
            rate => Duration::from_nanos(1_000_000_000 / u64::from(rate)),
        };
        self.speed = speed;
    }

    fn speed(&self) -> i32 {
        self.speed
    }

    fn run_speed(&mut self) -> Result<bool, StepperError> {
        self.poll(self.speed > 0)
    }

    fn run_speed_to_position(&mut self) -> Result<bool, StepperError> {
        let distance = self.distance_to_go();
        if distance == 0 {
            return Ok(false);
        }
        self.poll(distance > 0)
    }

    fn move_to(&mut self, position: i32) {
        self.target = position;
    }

    fn stop(&mut self) {
        self.target = self.position;
    }

    fn current_position(&self) -> i32 {
        self.position
    }

    fn target_position(&self) -> i32 {
        self.target
    }

    fn set_current_position(&mut self, position: i32) {
        self.position = position;
        self.target = position;
        self.speed = 0;
        self.step_interval = Duration::ZERO;
    }
}
