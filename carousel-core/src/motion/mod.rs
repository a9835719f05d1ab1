//! Carousel position tracking
//!
//! Maps absolute pulse positions to the card currently over the sensor.

pub mod position;

pub use position::{normalize, PositionMapper};
