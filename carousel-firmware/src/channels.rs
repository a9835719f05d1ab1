//! Inter-task communication channels
//!
//! Defines the static channels used for communication between Embassy tasks.
//! Uses embassy-sync primitives for safe async communication.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use carousel_core::Response;
use carousel_protocol::{Line, LineError};

/// Channel capacity for assembled console lines
const LINE_CHANNEL_SIZE: usize = 8;

/// Channel capacity for outgoing responses
const RESPONSE_CHANNEL_SIZE: usize = 16;

/// Command lines from the console (or the reason a line was dropped)
pub static LINE_CHANNEL: Channel<CriticalSectionRawMutex, Result<Line, LineError>, LINE_CHANNEL_SIZE> =
    Channel::new();

/// Responses from the sequencer, waiting to be written to the console
pub static RESPONSE_CHANNEL: Channel<CriticalSectionRawMutex, Response, RESPONSE_CHANNEL_SIZE> =
    Channel::new();
