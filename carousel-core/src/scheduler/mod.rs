//! Revolution schedule
//!
//! Derives the ordered list of motion + dwell tasks the sequencer walks once
//! per revolution.

pub mod schedule;

pub use schedule::{Task, TaskKind, TaskSchedule, TASK_COUNT};
