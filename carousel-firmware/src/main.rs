//! Carousel - Card Carousel Sequencer Firmware
//!
//! Main firmware binary for RP2040-based boards. Four test cards ride a
//! stepper-driven carousel past one sensor; an operator drives the run from
//! a serial terminal.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use carousel_core::config::CarouselConfig;
use carousel_drivers::{StepDirConfig, StepDirStepper};

use crate::tasks::sequencer::EmbassyClock;

mod channels;
mod tasks;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Carousel firmware starting...");

    // Initialize RP2040 peripherals
    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = CarouselConfig::default();
    if !config.is_valid() {
        error!("Built-in carousel configuration is invalid");
    }
    info!(
        "Carousel: {} pulses/rev, limit {}, maxSpeed {}",
        config.pulses_per_rev, config.rev_limit, config.max_speed
    );

    // Operator console on UART0
    let uart_config = UartConfig::default(); // 115200 baud default

    let tx_buf = TX_BUF.init([0u8; 256]);
    let rx_buf = RX_BUF.init([0u8; 256]);

    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, uart_config);
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, rx) = uart.split();

    info!("UART initialized for operator console");

    // Pin assignments are board-specific (SKR Pico: STEP=GPIO11, DIR=GPIO10, ENABLE=GPIO12)
    let step_pin = Output::new(p.PIN_11, Level::Low);
    let dir_pin = Output::new(p.PIN_10, Level::Low);
    // Enable is active low
    let enable_pin = Output::new(p.PIN_12, Level::Low);

    let stepper = StepDirStepper::new(step_pin, dir_pin, EmbassyClock, StepDirConfig::default());

    info!("Step/dir stepper initialized");

    // Spawn tasks
    spawner.spawn(tasks::console_rx_task(rx)).unwrap();
    spawner.spawn(tasks::console_tx_task(tx)).unwrap();
    spawner
        .spawn(tasks::sequencer_task(stepper, enable_pin, config))
        .unwrap();

    info!("All tasks spawned, firmware running");

    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}
