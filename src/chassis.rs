//! Four-wheel chassis actuator
//!
//! [`Chassis`] turns signed wheel movements into a direction and a speed per
//! wheel and drives the four light outputs. It keeps the status strings the
//! serial console reports back.
//!
//! # Lights
//! Lights can be disabled altogether, in which case every light write is
//! skipped. While light override is off the lights follow the front wheel pair:
//! - both front wheels forward: front lights
//! - both front wheels backward: rear lights
//! - front left backward and front right forward: front left light only
//! - front left forward and front right backward: front right light only

use core::fmt::Write;

use embedded_hal::digital::{OutputPin, PinState};
use heapless::String;
use thiserror::Error;

use crate::dispatch::{Actuator, MAX_WHEEL_SPEED};
use crate::wheel::{Wheel, NUM_WHEELS};

/// Rotation direction of one wheel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Forward,
    Backward,
    Stop,
}

impl Direction {
    pub fn of(movement: i32) -> Self {
        match movement {
            m if m > 0 => Direction::Forward,
            m if m < 0 => Direction::Backward,
            _ => Direction::Stop,
        }
    }
}

/// Motor driver behind the chassis
pub trait WheelDrive {
    type Error: core::fmt::Debug;

    /// Runs `wheel` in `direction` at `speed` (0-255)
    fn drive(&mut self, wheel: Wheel, direction: Direction, speed: u8) -> Result<(), Self::Error>;
}

#[derive(Debug, Error)]
pub enum ChassisError<M, L> {
    #[error("motor driver error: {0:?}")]
    Motor(M),
    #[error("light output error: {0:?}")]
    Light(L),
}

/// Rendered `(a,b,c,d)` wheel speed status
pub type SpeedStatus = String<24>;

/// Rendered light status, one `0`/`1` per light
pub type LightsStatus = String<NUM_WHEELS>;

pub struct Chassis<W, L> {
    drive: W,
    lights: [L; NUM_WHEELS],
    lights_enabled: bool,
    light_override: bool,
    speed_status: [u8; NUM_WHEELS],
    light_status: [bool; NUM_WHEELS],
}

impl<W, L> Chassis<W, L>
where
    W: WheelDrive,
    L: OutputPin,
{
    /// Creates a chassis with lights enabled and override off
    pub fn new(drive: W, lights: [L; NUM_WHEELS]) -> Self {
        Self {
            drive,
            lights,
            lights_enabled: true,
            light_override: false,
            speed_status: [0; NUM_WHEELS],
            light_status: [false; NUM_WHEELS],
        }
    }

    pub fn lights_enabled(&self) -> bool {
        self.lights_enabled
    }

    pub fn set_lights_enabled(&mut self, enabled: bool) {
        self.lights_enabled = enabled;
    }

    /// Speed last applied to each wheel
    pub fn wheel_speeds(&self) -> [u8; NUM_WHEELS] {
        self.speed_status
    }

    /// Light state last written to the outputs
    pub fn light_states(&self) -> [bool; NUM_WHEELS] {
        self.light_status
    }

    /// Wheel speeds as `(a,b,c,d)`
    pub fn wheel_speed_status(&self) -> SpeedStatus {
        let mut status = SpeedStatus::new();
        // At most 4 * 3 digits, 3 commas and 2 parentheses
        let _ = write!(
            status,
            "({},{},{},{})",
            self.speed_status[0], self.speed_status[1], self.speed_status[2], self.speed_status[3]
        );
        status
    }

    /// Light states as four `0`/`1` characters
    pub fn lights_status(&self) -> LightsStatus {
        self.light_status
            .iter()
            .map(|&on| if on { '1' } else { '0' })
            .collect()
    }

    pub fn release(self) -> (W, [L; NUM_WHEELS]) {
        (self.drive, self.lights)
    }

    fn write_lights(
        &mut self,
        lights: [bool; NUM_WHEELS],
    ) -> Result<(), ChassisError<W::Error, L::Error>> {
        if !self.lights_enabled {
            return Ok(());
        }
        for (i, (pin, on)) in self.lights.iter_mut().zip(lights).enumerate() {
            pin.set_state(PinState::from(on))
                .map_err(ChassisError::Light)?;
            self.light_status[i] = on;
        }
        Ok(())
    }
}

/// Lights implied by the movement of the front wheel pair
fn signal_lights(movement: [i32; NUM_WHEELS]) -> [bool; NUM_WHEELS] {
    let left = Direction::of(movement[Wheel::FrontLeft.index()]);
    let right = Direction::of(movement[Wheel::FrontRight.index()]);
    match (left, right) {
        (Direction::Forward, Direction::Forward) => [true, true, false, false],
        (Direction::Backward, Direction::Backward) => [false, false, true, true],
        (Direction::Backward, Direction::Forward) => [true, false, false, false],
        (Direction::Forward, Direction::Backward) => [false, true, false, false],
        _ => [false; NUM_WHEELS],
    }
}

impl<W, L> Actuator for Chassis<W, L>
where
    W: WheelDrive,
    L: OutputPin,
{
    type Error = ChassisError<W::Error, L::Error>;

    fn set_wheel_movement(&mut self, movement: [i32; NUM_WHEELS]) -> Result<(), Self::Error> {
        for wheel in Wheel::ALL {
            let m = movement[wheel.index()];
            let speed = m.saturating_abs().min(MAX_WHEEL_SPEED) as u8;
            self.drive
                .drive(wheel, Direction::of(m), speed)
                .map_err(ChassisError::Motor)?;
            self.speed_status[wheel.index()] = speed;
        }

        if !self.light_override {
            self.write_lights(signal_lights(movement))?;
        }
        Ok(())
    }

    fn set_lights(&mut self, lights: [bool; NUM_WHEELS]) -> Result<(), Self::Error> {
        self.write_lights(lights)
    }

    fn light_override(&self) -> bool {
        self.light_override
    }

    fn set_light_override(&mut self, enabled: bool) {
        self.light_override = enabled;
    }
}
