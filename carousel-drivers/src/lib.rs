//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in carousel-core:
//!
//! - Stepper drivers (step/direction pulse output)
//! - Clock sources gating the step interval

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod clock;
pub mod stepper;

pub use clock::SystemClock;
pub use stepper::{StepDirConfig, StepDirStepper};
