//! TB6612FNG drivetrain
//!
//! Two dual drivers run the four wheels: the front pair on PWM slice 0, the
//! rear pair on slice 1. Both drivers share one standby line which is held
//! high while the firmware runs.

use chassis_control::chassis::{Direction, WheelDrive};
use chassis_control::{Wheel, NUM_WHEELS};
use core::convert::Infallible;
use embassy_rp::gpio::{AnyPin, Level, Output};
use embassy_rp::pwm::{self, Pwm, PwmOutput};
use tb6612fng::{DriveCommand, Motor, MotorError};

use crate::system::resources::DrivetrainResources;

/// Cheap DC motors run smoother at a low switching frequency
const PWM_FREQUENCY_HZ: u32 = 10_000;

type WheelMotor = Motor<Output<'static>, Output<'static>, PwmOutput<'static>>;

pub type DrivetrainError =
    MotorError<Infallible, Infallible, <PwmOutput<'static> as embedded_hal::pwm::ErrorType>::Error>;

/// Why the drivetrain could not be brought up
#[derive(Debug)]
pub enum SetupError {
    /// A PWM slice did not hand out both channels
    MissingPwmChannel,
    Motor(DrivetrainError),
}

pub struct Drivetrain {
    motors: [WheelMotor; NUM_WHEELS],
    _standby: Output<'static>,
}

impl Drivetrain {
    pub fn new(r: DrivetrainResources) -> Result<Self, SetupError> {
        let clock_freq_hz = embassy_rp::clocks::clk_sys_freq();
        // Smallest divider that keeps the period within 16 bits
        let divider = ((clock_freq_hz / PWM_FREQUENCY_HZ) / 65535 + 1) as u8;
        let period = (clock_freq_hz / (PWM_FREQUENCY_HZ * divider as u32)) as u16 - 1;

        let mut config = pwm::Config::default();
        config.divider = divider.into();
        config.top = period;

        let (front_left_pwm, front_right_pwm) = Pwm::new_output_ab(
            r.front_slice,
            r.front_left_pwm_pin,
            r.front_right_pwm_pin,
            config.clone(),
        )
        .split();
        let (rear_left_pwm, rear_right_pwm) =
            Pwm::new_output_ab(r.rear_slice, r.rear_left_pwm_pin, r.rear_right_pwm_pin, config)
                .split();

        let motors = [
            motor(r.front_left_in1.into(), r.front_left_in2.into(), front_left_pwm)?,
            motor(r.front_right_in1.into(), r.front_right_in2.into(), front_right_pwm)?,
            motor(r.rear_left_in1.into(), r.rear_left_in2.into(), rear_left_pwm)?,
            motor(r.rear_right_in1.into(), r.rear_right_in2.into(), rear_right_pwm)?,
        ];

        Ok(Self {
            motors,
            _standby: Output::new(r.standby_pin, Level::High),
        })
    }
}

fn motor(
    in1: AnyPin,
    in2: AnyPin,
    pwm: Option<PwmOutput<'static>>,
) -> Result<WheelMotor, SetupError> {
    let pwm = pwm.ok_or(SetupError::MissingPwmChannel)?;
    Motor::new(Output::new(in1, Level::Low), Output::new(in2, Level::Low), pwm)
        .map_err(SetupError::Motor)
}

/// Maps a 0-255 wheel speed onto the driver's duty cycle percentage
fn duty_percent(speed: u8) -> u8 {
    (u16::from(speed) * 100 / 255) as u8
}

impl WheelDrive for Drivetrain {
    type Error = DrivetrainError;

    fn drive(&mut self, wheel: Wheel, direction: Direction, speed: u8) -> Result<(), Self::Error> {
        let command = match direction {
            Direction::Forward => DriveCommand::Forward(duty_percent(speed)),
            Direction::Backward => DriveCommand::Backward(duty_percent(speed)),
            Direction::Stop => DriveCommand::Stop,
        };
        self.motors[wheel.index()].drive(command)
    }
}
