//! Sequencer run modes and command errors
//!
//! The run mode is explicit and finite. Operator transitions are validated
//! here before the sequencer mutates anything.

pub mod machine;

pub use machine::{CommandError, Mode, WindDown};
