//! Carousel operator protocol
//!
//! This crate defines the line-oriented text protocol spoken over the
//! console UART between an operator terminal and the carousel controller.
//!
//! # Protocol Overview
//!
//! One command per line, space-separated tokens, numeric arguments may carry
//! a leading `-`:
//! ```text
//! pos | maxPulses [n] | limit [n] | maxSpeed [n] | speed <card> [n] | origin
//! move <n> | goto <n> | go | halt | pause | stop | restart | status
//! scantime <card> [ms] | offtime <card> [ms]
//! ```
//!
//! Raw bytes are assembled into lines by [`LineBuffer`], then turned into a
//! typed [`Command`] by [`Command::parse`]. Executing commands and formatting
//! replies is the job of `carousel-core`.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod command;
pub mod line;

pub use command::{Command, ParseError, MAX_ARGS};
pub use line::{Line, LineBuffer, LineError, MAX_LINE_LEN};
