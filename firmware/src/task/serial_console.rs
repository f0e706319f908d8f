//! Serial console receiver
//!
//! Assembles lines from the BLE serial link. Mode switches are applied right
//! here so they take effect while a script is replaying; every other request
//! is queued for the control task.

use chassis_control::console::{Console, ConsoleError, ConsoleRequest};
use chassis_control::script::LINE_CAPACITY;
use defmt::{debug, warn};
use embassy_rp::peripherals::UART1;
use embassy_rp::uart::BufferedUartRx;
use embedded_io_async::Read;
use heapless::String;

use crate::system::event;
use crate::system::state::{self, MODE};

/// Receives console lines
///
/// Lines end at `\n` or `\r`. A line longer than the buffer is discarded as a
/// whole.
struct LineAssembler {
    line: String<LINE_CAPACITY>,
    overflow: bool,
}

impl LineAssembler {
    const fn new() -> Self {
        Self {
            line: String::new(),
            overflow: false,
        }
    }

    /// Adds one byte, returning the completed line
    fn push(&mut self, byte: u8) -> Option<Result<&str, ConsoleError>> {
        match byte {
            b'\n' | b'\r' => {
                let overflow = core::mem::replace(&mut self.overflow, false);
                if overflow {
                    self.line.clear();
                    Some(Err(ConsoleError::LineTooLong))
                } else if self.line.is_empty() {
                    None
                } else {
                    Some(Ok(self.line.as_str()))
                }
            }
            _ => {
                if self.overflow || self.line.push(char::from(byte)).is_err() {
                    self.overflow = true;
                }
                None
            }
        }
    }

    fn clear(&mut self) {
        self.line.clear();
    }
}

#[embassy_executor::task]
pub async fn serial_console(mut rx: BufferedUartRx<'static, UART1>) {
    let console = Console::new(&MODE);
    let mut assembler = LineAssembler::new();
    let mut buf = [0u8; 32];

    loop {
        let n = match rx.read(&mut buf).await {
            Ok(n) => n,
            Err(e) => {
                warn!("Serial read failed: {}", e);
                continue;
            }
        };

        for &byte in &buf[..n] {
            let Some(line) = assembler.push(byte) else {
                continue;
            };
            match line.and_then(ConsoleRequest::parse) {
                Ok(Some(ConsoleRequest::SetMode(mode))) => {
                    let reply = console.switch_mode(mode);
                    state::mode_switched(mode);
                    event::try_send_status(reply.text());
                }
                Ok(Some(request)) => {
                    debug!("Console request {}", request);
                    event::forward_request(request);
                }
                Ok(None) => {}
                Err(e) => warn!("Console line rejected: {}", e),
            }
            assembler.clear();
        }
    }
}
