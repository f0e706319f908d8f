//! Status output
//!
//! Every status line goes out twice: as text on the serial link and as framed
//! chunks on the status bus. A receiver that does not answer only loses the
//! rest of the current message.

use chassis_control::framing::{frames, RECEIVER_ADDRESS};
use defmt::warn;
use embassy_rp::i2c::{Async, I2c};
use embassy_rp::peripherals::{I2C0, UART1};
use embassy_rp::uart::BufferedUartTx;
use embedded_io_async::Write;

use crate::system::event;

#[embassy_executor::task]
pub async fn status_output(
    mut serial: BufferedUartTx<'static, UART1>,
    mut bus: I2c<'static, I2C0, Async>,
) {
    loop {
        let line = event::receive_status().await;

        if let Err(e) = write_line(&mut serial, &line).await {
            warn!("Serial write failed: {}", e);
        }

        for frame in frames(&line) {
            if let Err(e) = bus.write_async(RECEIVER_ADDRESS, frame.to_bytes()).await {
                warn!("Status bus write failed: {}", e);
                break;
            }
        }
    }
}

async fn write_line<W: Write>(serial: &mut W, line: &str) -> Result<(), W::Error> {
    serial.write_all(line.as_bytes()).await?;
    serial.write_all(b"\r\n").await
}
