//! Console UART receive task
//!
//! Assembles operator bytes into command lines for the sequencer.

use defmt::*;
use embassy_rp::uart::BufferedUartRx;
use embedded_io_async::Read;

use carousel_protocol::LineBuffer;

use crate::channels::LINE_CHANNEL;

/// Buffer size for UART receive
const RX_BUF_SIZE: usize = 64;

/// Console RX task - reads bytes and forwards complete lines
#[embassy_executor::task]
pub async fn console_rx_task(mut rx: BufferedUartRx) {
    info!("Console RX task started");

    let mut lines = LineBuffer::new();
    let mut buf = [0u8; RX_BUF_SIZE];

    loop {
        match rx.read(&mut buf).await {
            Ok(n) if n > 0 => {
                trace!("RX: {} bytes", n);

                let mut rest = &buf[..n];
                while !rest.is_empty() {
                    let (outcome, remaining) = lines.feed_bytes(rest);
                    rest = remaining;

                    if let Some(line) = outcome {
                        if let Err(e) = &line {
                            warn!("Dropped console line: {:?}", e);
                        }
                        // Wait for room rather than lose a command
                        LINE_CHANNEL.send(line).await;
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!("UART read error: {:?}", e);
                lines.reset();
            }
        }
    }
}
