//! Configuration types
//!
//! Compile-time defaults for the carousel. There is no runtime loading:
//! every value here can be changed over the console while the machine runs,
//! and reverts on reset.

pub mod types;

pub use types::*;
