//! Wheel pulse counting
//!
//! One task per wheel waits for rising edges of the slot sensor and records
//! them in the shared odometry. Counting is lock-free; the drain tick turns
//! the counts into distance.

use chassis_control::{Wheel, NUM_WHEELS};
use embassy_rp::gpio::{Input, Pull};

use crate::system::resources::PulseSensorResources;
use crate::system::state::ODOMETRY;

/// Slot sensor input of every wheel, in wheel order
pub fn sensors(r: PulseSensorResources) -> [(Wheel, Input<'static>); NUM_WHEELS] {
    [
        (Wheel::FrontLeft, Input::new(r.front_left, Pull::Up)),
        (Wheel::FrontRight, Input::new(r.front_right, Pull::Up)),
        (Wheel::RearLeft, Input::new(r.rear_left, Pull::Up)),
        (Wheel::RearRight, Input::new(r.rear_right, Pull::Up)),
    ]
}

#[embassy_executor::task(pool_size = 4)]
pub async fn pulse_count(wheel: Wheel, mut sensor: Input<'static>) {
    loop {
        sensor.wait_for_rising_edge().await;
        ODOMETRY.record_pulse(wheel);
    }
}
