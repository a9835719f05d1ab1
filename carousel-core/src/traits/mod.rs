//! Hardware abstraction traits
//!
//! These traits define the interface between the sequencing logic and the
//! board: the motor driver that emits step pulses and the console that
//! delivers command lines.

pub mod console;
pub mod stepper;

pub use console::LineSource;
pub use stepper::{StepperDriver, StepperError};
