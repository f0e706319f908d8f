//! Movement command execution
//!
//! [`CommandDispatcher::execute`] runs one command against the [`Actuator`].
//! Two commands block the calling task until they are done:
//! - `DURATION` waits for the given time, then stops and switches the lights off
//! - `DISTANCE` polls the odometry until every wheel has covered the distance,
//!   then resets the odometry and stops
//!
//! Blocking commands cannot be cancelled; a mode change is only noticed by the
//! caller once they return.

use embedded_hal_async::delay::DelayNs;
use thiserror::Error;

use crate::command::{parse_int, tuple_items, CommandKind};
use crate::odometry::OdometryAccumulator;
use crate::wheel::NUM_WHEELS;

/// Highest wheel speed accepted by the actuator
pub const MAX_WHEEL_SPEED: i32 = 255;

/// Time between two odometry checks while a `DISTANCE` command runs
pub const DISTANCE_POLL_INTERVAL_MS: u32 = 10;

/// Hardware the dispatcher drives
pub trait Actuator {
    type Error: core::fmt::Debug;

    /// Sets the signed movement of every wheel, in [`crate::Wheel`] order
    ///
    /// Values outside ±[`MAX_WHEEL_SPEED`] are clamped by the implementation.
    fn set_wheel_movement(&mut self, movement: [i32; NUM_WHEELS]) -> Result<(), Self::Error>;

    /// Switches each light on or off, in [`crate::Wheel`] order
    fn set_lights(&mut self, lights: [bool; NUM_WHEELS]) -> Result<(), Self::Error>;

    /// Whether lights are under explicit control instead of following the wheels
    fn light_override(&self) -> bool;

    fn set_light_override(&mut self, enabled: bool);
}

/// Reasons a command did not run
#[derive(Debug, Error)]
pub enum CommandError<E> {
    #[error("unknown command")]
    UnknownCommand,
    #[error("malformed argument for {0:?}")]
    MalformedArgument(CommandKind),
    #[error("actuator failure: {0:?}")]
    Actuator(E),
}

/// Executes movement commands against an actuator
pub struct CommandDispatcher<'a, A, D> {
    actuator: A,
    delay: D,
    odometry: &'a OdometryAccumulator,
    /// Last movement sent to the wheels
    movement: [i32; NUM_WHEELS],
}

impl<'a, A, D> CommandDispatcher<'a, A, D>
where
    A: Actuator,
    D: DelayNs,
{
    pub fn new(actuator: A, delay: D, odometry: &'a OdometryAccumulator) -> Self {
        Self {
            actuator,
            delay,
            odometry,
            movement: [0; NUM_WHEELS],
        }
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn actuator_mut(&mut self) -> &mut A {
        &mut self.actuator
    }

    pub fn odometry(&self) -> &'a OdometryAccumulator {
        self.odometry
    }

    /// Last movement sent to the wheels
    pub fn movement(&self) -> [i32; NUM_WHEELS] {
        self.movement
    }

    /// Runs one command
    ///
    /// `name` is matched without regard to case, and so are the `ON` tokens of
    /// a `LIGHTS` pattern. A tuple argument without parentheses is not applied
    /// and reported as [`CommandError::MalformedArgument`].
    pub async fn execute(
        &mut self,
        name: &str,
        argument: &str,
    ) -> Result<CommandKind, CommandError<A::Error>> {
        let Some(kind) = CommandKind::lookup(name) else {
            return Err(CommandError::UnknownCommand);
        };
        info!("Executing {} command: {}", kind.name(), argument);

        match kind {
            CommandKind::Wheels => self.wheels(argument)?,
            CommandKind::Forward => {
                let speed = scalar_speed(argument);
                self.move_wheels([speed; NUM_WHEELS])?;
            }
            CommandKind::Backward => {
                let speed = scalar_speed(argument);
                self.move_wheels([-speed; NUM_WHEELS])?;
            }
            CommandKind::FullStop => self.full_stop()?,
            // Rotation needs a heading sensor the chassis does not have yet
            CommandKind::Rotate => self.full_stop()?,
            CommandKind::Lights => self.lights(argument)?,
            CommandKind::Duration => {
                let millis = u32::try_from(parse_int(argument)).unwrap_or(0);
                self.delay.delay_ms(millis).await;
                self.full_stop()?;
                self.actuator
                    .set_lights([false; NUM_WHEELS])
                    .map_err(CommandError::Actuator)?;
            }
            CommandKind::Distance => {
                let target_mm = u32::try_from(parse_int(argument))
                    .unwrap_or(0)
                    .saturating_mul(10);
                self.wait_for_distance(target_mm).await;
                self.full_stop()?;
            }
        }

        Ok(kind)
    }

    /// Applies a `(fl,fr,rl,rr)` movement
    ///
    /// Wheels missing from a short tuple keep their last movement.
    fn wheels(&mut self, argument: &str) -> Result<(), CommandError<A::Error>> {
        let items = tuple_items(argument)
            .ok_or(CommandError::MalformedArgument(CommandKind::Wheels))?;
        let mut movement = self.movement;
        for (target, item) in movement.iter_mut().zip(items) {
            *target = parse_int(item);
        }
        debug!("Wheel movement {:?}", movement);
        self.move_wheels(movement)
    }

    /// Applies an explicit `(ON,OFF,ON,OFF)` light pattern
    ///
    /// Light override is forced on while the pattern is applied and restored to
    /// its previous value afterwards, whatever the outcome.
    fn lights(&mut self, argument: &str) -> Result<(), CommandError<A::Error>> {
        let mut guard = OverrideGuard::force(&mut self.actuator);

        let items = tuple_items(argument)
            .ok_or(CommandError::MalformedArgument(CommandKind::Lights))?;
        let mut lights = [false; NUM_WHEELS];
        for (light, item) in lights.iter_mut().zip(items) {
            *light = item.eq_ignore_ascii_case("ON");
        }
        debug!("Light pattern {:?}", lights);
        guard.actuator.set_lights(lights).map_err(CommandError::Actuator)
    }

    async fn wait_for_distance(&mut self, target_mm: u32) {
        while !self.odometry.all_reached(target_mm) {
            self.delay.delay_ms(DISTANCE_POLL_INTERVAL_MS).await;
        }
        info!(
            "Distance {} mm reached: {:?}",
            target_mm,
            self.odometry.distances()
        );
        self.odometry.reset_distances();
    }

    fn move_wheels(&mut self, movement: [i32; NUM_WHEELS]) -> Result<(), CommandError<A::Error>> {
        self.movement = movement;
        self.actuator
            .set_wheel_movement(movement)
            .map_err(CommandError::Actuator)
    }

    fn full_stop(&mut self) -> Result<(), CommandError<A::Error>> {
        self.move_wheels([0; NUM_WHEELS])
    }
}

/// Reads a `FORWARD`/`BACKWARD` speed as a magnitude up to [`MAX_WHEEL_SPEED`]
fn scalar_speed(argument: &str) -> i32 {
    parse_int(argument).saturating_abs().min(MAX_WHEEL_SPEED)
}

/// Holds light override on and restores the previous setting when dropped
struct OverrideGuard<'g, A: Actuator> {
    actuator: &'g mut A,
    previous: bool,
}

impl<'g, A: Actuator> OverrideGuard<'g, A> {
    fn force(actuator: &'g mut A) -> Self {
        let previous = actuator.light_override();
        actuator.set_light_override(true);
        Self { actuator, previous }
    }
}

impl<A: Actuator> Drop for OverrideGuard<'_, A> {
    fn drop(&mut self) {
        self.actuator.set_light_override(self.previous);
    }
}
