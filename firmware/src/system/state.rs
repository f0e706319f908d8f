//! System State
//!
//! State shared between tasks. Both values live in plain statics because
//! they are touched from places that cannot await a mutex:
//! - Odometry: written by the pulse tasks, drained by the tick, read by `DISTANCE`
//! - Operation mode: flipped by the console and the mode button, polled by the
//!   script runner between commands
//!
//! Boots in automatic mode so the embedded movement script starts right away.

use chassis_control::mode::{ModeFlag, OperationMode};
use chassis_control::odometry::{OdometryAccumulator, WheelCalibration};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

/// Pulse counters and cumulative distance of all four wheels
pub static ODOMETRY: OdometryAccumulator = OdometryAccumulator::new(WheelCalibration::DEFAULT);

/// Current operation mode
pub static MODE: ModeFlag = ModeFlag::new(OperationMode::Automatic);

/// Raised whenever the mode is switched, so an idle control task wakes up
static MODE_CHANGED: Signal<CriticalSectionRawMutex, OperationMode> = Signal::new();

/// Publishes a mode switch
pub fn mode_switched(mode: OperationMode) {
    MODE_CHANGED.signal(mode);
}

/// Waits for the next mode switch
pub async fn wait_mode_switch() -> OperationMode {
    MODE_CHANGED.wait().await
}
