//! Console UART transmit task
//!
//! Writes sequencer responses back to the operator, one line each.

use defmt::*;
use embassy_rp::uart::BufferedUartTx;
use embedded_io_async::Write;

use crate::channels::RESPONSE_CHANNEL;

/// Console TX task - formats and sends responses
#[embassy_executor::task]
pub async fn console_tx_task(mut tx: BufferedUartTx) {
    info!("Console TX task started");

    loop {
        let response = RESPONSE_CHANNEL.receive().await;
        let line = response.to_line();
        trace!("TX: {}", line.as_str());

        if let Err(e) = tx.write_all(line.as_bytes()).await {
            warn!("Failed to send response: {:?}", e);
            continue;
        }
        if let Err(e) = tx.write_all(b"\r\n").await {
            warn!("Failed to send line terminator: {:?}", e);
        }
    }
}
