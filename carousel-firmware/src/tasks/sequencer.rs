//! Sequencer control loop task
//!
//! Polls the sequencer as fast as the executor allows. Each pass drains the
//! console lines that have arrived, emits at most one step, and hands any
//! responses to the console writer.

use core::time::Duration;

use defmt::*;
use embassy_futures::yield_now;
use embassy_rp::gpio::Output;
use embassy_time::{Instant, Timer};

use carousel_core::config::CarouselConfig;
use carousel_core::traits::LineSource;
use carousel_core::Sequencer;
use carousel_drivers::{StepDirStepper, SystemClock};
use carousel_protocol::{Line, LineError};

use crate::channels::{LINE_CHANNEL, RESPONSE_CHANNEL};

/// Back-off after a stepper fault before polling again
const FAULT_BACKOFF_MS: u64 = 100;

/// Monotonic clock backed by the embassy time driver
pub struct EmbassyClock;

impl SystemClock for EmbassyClock {
    fn elapsed(&self) -> Duration {
        Duration::from_micros(Instant::now().as_micros())
    }
}

/// Carousel motor on GPIO step/dir lines
pub type CarouselStepper = StepDirStepper<Output<'static>, Output<'static>, EmbassyClock>;

/// Non-blocking view of the console line channel
struct ConsoleLines;

impl LineSource for ConsoleLines {
    fn next_line(&mut self) -> Option<Result<Line, LineError>> {
        LINE_CHANNEL.try_receive().ok()
    }
}

/// Sequencer task - owns the motor and all sequencing state
///
/// `_enable` keeps the driver enable line asserted for the life of the task.
#[embassy_executor::task]
pub async fn sequencer_task(
    mut stepper: CarouselStepper,
    _enable: Output<'static>,
    config: CarouselConfig,
) {
    info!("Sequencer task started");

    let mut sequencer = Sequencer::new(config);
    sequencer.init(&mut stepper);
    let mut lines = ConsoleLines;

    loop {
        let now_ms = Instant::now().as_millis();

        if let Err(e) = sequencer.service(&mut stepper, &mut lines, now_ms) {
            error!("Stepper fault: {:?}", e);
            Timer::after_millis(FAULT_BACKOFF_MS).await;
        }

        // Leave responses queued in the sequencer until the writer has room
        while RESPONSE_CHANNEL.free_capacity() > 0 {
            let Some(response) = sequencer.pop_response() else {
                break;
            };
            let _ = RESPONSE_CHANNEL.try_send(response);
        }

        yield_now().await;
    }
}
