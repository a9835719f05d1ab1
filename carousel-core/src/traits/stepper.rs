//! Stepper motor driver trait
//!
//! Constant-speed step emission in the style of the classic AccelStepper
//! API: the caller polls `run_speed*` as often as it can and the driver
//! emits at most one pulse per poll, only once the step interval for the
//! current speed has elapsed.

/// Errors that can occur with stepper operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StepperError {
    /// Step or direction output could not be driven
    PinFault,
    /// Driver reported a fault condition
    DriverFault,
}

/// Trait for pulse-driven stepper motors
///
/// Positions are absolute pulse counts; speeds are signed pulses/s.
pub trait StepperDriver {
    /// Set the speed ceiling in pulses/s
    fn set_max_speed(&mut self, speed: i32);

    /// Set the constant running speed in pulses/s
    ///
    /// Values beyond the ceiling are clamped by the driver.
    fn set_speed(&mut self, speed: i32);

    /// Get the current running speed
    fn speed(&self) -> i32;

    /// Emit one step at the current speed if one is due
    ///
    /// Direction follows the sign of the speed. Returns true if a step was
    /// emitted.
    fn run_speed(&mut self) -> Result<bool, StepperError>;

    /// Emit one step toward the target if one is due
    ///
    /// Direction follows the target, the magnitude of the speed sets the
    /// rate. Returns true if a step was emitted.
    fn run_speed_to_position(&mut self) -> Result<bool, StepperError>;

    /// Set an absolute target position
    fn move_to(&mut self, position: i32);

    /// Set a target relative to the current position
    fn move_by(&mut self, delta: i32) {
        let target = self.current_position().saturating_add(delta);
        self.move_to(target);
    }

    /// Stop as quickly as possible
    ///
    /// The target collapses onto the current position.
    fn stop(&mut self);

    /// Current absolute position
    fn current_position(&self) -> i32;

    /// Current target position
    fn target_position(&self) -> i32;

    /// Redefine the current position without moving
    ///
    /// The target is set to the same value and the speed to 0.
    fn set_current_position(&mut self, position: i32);

    /// Pulses remaining to the target
    fn distance_to_go(&self) -> i32 {
        self.target_position() - self.current_position()
    }
}
