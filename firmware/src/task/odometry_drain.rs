//! Periodic conversion of wheel pulses into distance

use defmt::debug;
use embassy_time::{Duration, Ticker};

use crate::system::state::ODOMETRY;

const DRAIN_INTERVAL: Duration = Duration::from_millis(100);

#[embassy_executor::task]
pub async fn odometry_drain() {
    let mut ticker = Ticker::every(DRAIN_INTERVAL);
    loop {
        ticker.next().await;
        if let Some(report) = ODOMETRY.drain() {
            debug!(
                "Pulses {} added {} mm, distance {} mm",
                report.pulses, report.added_mm, report.distance_mm
            );
        }
    }
}
