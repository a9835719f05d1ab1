//! Board-agnostic core logic for the card carousel firmware
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Hardware abstraction traits (stepper driver, command line source)
//! - Card registry with per-card tunables and angular bands
//! - Position mapping (pulse position to active card)
//! - Per-revolution task schedule
//! - Sequencer state machine and command dispatch
//! - Operator response model

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod log;

pub mod cards;
pub mod config;
pub mod motion;
pub mod response;
pub mod scheduler;
pub mod sequencer;
pub mod state;
pub mod traits;

pub use cards::{Card, CardId, CardRegistry, CARD_COUNT};
pub use response::{Notice, Reading, Response};
pub use sequencer::Sequencer;
pub use state::{CommandError, Mode};
