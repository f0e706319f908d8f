//! Chassis firmware entry point
//!
//! Reads the flashed settings, brings up the hardware and spawns the tasks.

#![no_std]
#![no_main]

use crate::task::{
    control::control, mode_button::mode_button, odometry_drain::odometry_drain,
    pulse_count::pulse_count, serial_console::serial_console, status_output::status_output,
};
use chassis_control::config::{Config, DEFAULT_CONFIG_FILE};
use defmt::{info, warn};
use embassy_executor::Spawner;
use embassy_rp::block::ImageDef;
use system::resources::{
    self, AssignedResources, DrivetrainResources, LightResources, ModeButtonResources,
    PulseSensorResources, SerialResources, StatusBusResources,
};
use {defmt_rtt as _, panic_probe as _};

/// Firmware image type for bootloader
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = ImageDef::secure_exe();

/// Hardware bring-up and shared state
mod system;
/// Task implementations
mod task;

/// Settings flashed with the firmware
const SETTINGS: &str = include_str!("../assets/CONF.TXT");

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());
    let r = split_resources!(p);

    let (config, rejected) = Config::parse(SETTINGS);
    if rejected > 0 {
        warn!("{} entries of {} rejected", rejected, DEFAULT_CONFIG_FILE);
    }
    info!("Running {} script cycles", config.run_cycles);

    let (serial_tx, serial_rx) = resources::init_serial(r.serial);
    let status_bus = resources::init_status_bus(r.status_bus);

    // Status output first so the settings dump has a consumer
    spawner.spawn(status_output(serial_tx, status_bus)).unwrap();
    config.dump(system::event::try_send_status);

    for (wheel, sensor) in task::pulse_count::sensors(r.pulse_sensors) {
        spawner.spawn(pulse_count(wheel, sensor)).unwrap();
    }
    spawner.spawn(odometry_drain()).unwrap();
    spawner.spawn(serial_console(serial_rx)).unwrap();
    spawner.spawn(mode_button(r.mode_button)).unwrap();
    spawner.spawn(control(r.drivetrain, r.lights, config)).unwrap();
}
