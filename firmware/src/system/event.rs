//! Inter-task Channels
//!
//! - Console requests: serial link → control task
//! - Status lines: any task → status output (serial link and status bus)

use chassis_control::console::ConsoleRequest;
use defmt::warn;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::String;

/// Longest status line forwarded to the outputs
pub const STATUS_LINE_CAPACITY: usize = 96;

pub type StatusLine = String<STATUS_LINE_CAPACITY>;

/// Requests wait here while a script is being replayed
static REQUEST_CHANNEL: Channel<CriticalSectionRawMutex, ConsoleRequest, 4> = Channel::new();

/// Holds a full settings dump
static STATUS_CHANNEL: Channel<CriticalSectionRawMutex, StatusLine, 24> = Channel::new();

/// Queues a console request, dropping it when the control task is behind
pub fn forward_request(request: ConsoleRequest) {
    if let Err(e) = REQUEST_CHANNEL.try_send(request) {
        warn!("Console request dropped, control task busy: {}", defmt::Debug2Format(&e));
    }
}

/// Receives the next console request
pub async fn receive_request() -> ConsoleRequest {
    REQUEST_CHANNEL.receive().await
}

/// Queues a status line, cut at [`STATUS_LINE_CAPACITY`] bytes
pub async fn send_status(text: &str) {
    STATUS_CHANNEL.send(status_line(text)).await;
}

/// Queues a status line without waiting, dropping it when the queue is full
pub fn try_send_status(text: &str) {
    if STATUS_CHANNEL.try_send(status_line(text)).is_err() {
        warn!("Status line dropped: {}", text);
    }
}

/// Receives the next status line
pub async fn receive_status() -> StatusLine {
    STATUS_CHANNEL.receive().await
}

fn status_line(text: &str) -> StatusLine {
    let mut line = StatusLine::new();
    for c in text.chars() {
        if line.push(c).is_err() {
            break;
        }
    }
    line
}
