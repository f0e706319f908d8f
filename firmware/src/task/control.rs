//! Chassis control task
//!
//! Owns the drivetrain and the lights. In automatic mode it replays the
//! movement script; in manual mode it executes the requests received on the
//! serial console. A replay that runs through all its cycles hands control
//! back to the console by switching to manual mode.

use core::fmt::Write;

use chassis_control::chassis::Chassis;
use chassis_control::config::{Config, DEFAULT_COMMAND_FILE};
use chassis_control::console::Console;
use chassis_control::dispatch::{Actuator, CommandDispatcher, CommandError};
use chassis_control::mode::OperationMode;
use chassis_control::runner::{RunSummary, ScriptRunner, TextScript};
use defmt::{error, info, warn, Debug2Format};
use embassy_futures::select::{select, Either};
use embassy_rp::gpio::{Level, Output};
use embassy_time::Delay;

use crate::system::drivetrain::Drivetrain;
use crate::system::event::{self, StatusLine};
use crate::system::resources::{DrivetrainResources, LightResources};
use crate::system::state::{self, MODE, ODOMETRY};

/// Movement script flashed with the firmware
const MOVEMENT_SCRIPT: &str = include_str!("../../assets/COMMANDS/GUIDE.TXT");

#[embassy_executor::task]
pub async fn control(drive: DrivetrainResources, lights: LightResources, config: Config) {
    let drivetrain = match Drivetrain::new(drive) {
        Ok(drivetrain) => drivetrain,
        Err(e) => {
            error!("Drivetrain setup failed: {}", Debug2Format(&e));
            return;
        }
    };
    let lights = [
        Output::new(lights.front_left, Level::Low),
        Output::new(lights.front_right, Level::Low),
        Output::new(lights.rear_left, Level::Low),
        Output::new(lights.rear_right, Level::Low),
    ];

    let mut chassis = Chassis::new(drivetrain, lights);
    chassis.set_lights_enabled(config.lights_enabled);
    chassis.set_light_override(config.light_override);

    if config.movements.as_str() != DEFAULT_COMMAND_FILE {
        warn!(
            "Script {} is not available, replaying {}",
            config.movements.as_str(),
            DEFAULT_COMMAND_FILE
        );
    }

    let mut dispatcher = CommandDispatcher::new(chassis, Delay, &ODOMETRY);
    let mut runner = ScriptRunner::new(config.run_cycles);
    let mut script = TextScript::new(MOVEMENT_SCRIPT);
    let console = Console::new(&MODE);

    loop {
        match MODE.get() {
            OperationMode::Automatic => {
                event::send_status("Replaying movement script").await;
                let summary = runner.run(&mut script, &MODE, &mut dispatcher).await;
                event::send_status(&summary_line(&summary)).await;

                if summary.interrupted {
                    if let Err(e) = dispatcher.execute("FULLSTOP", "").await {
                        error!("Stopping after replay failed: {}", Debug2Format(&e));
                    }
                } else {
                    info!("Replay complete, switching to manual mode");
                    event::send_status(console.switch_mode(OperationMode::Manual).text()).await;
                }
            }
            OperationMode::Manual => {
                match select(event::receive_request(), state::wait_mode_switch()).await {
                    Either::First(request) => {
                        match console.handle(request, &mut dispatcher).await {
                            Ok(reply) => event::send_status(reply.text()).await,
                            Err(e) => {
                                warn!("Console request failed: {}", Debug2Format(&e));
                                event::send_status(rejection_text(&e)).await;
                            }
                        }
                    }
                    Either::Second(mode) => info!("Mode switched to {}", mode),
                }
            }
        }
    }
}

fn rejection_text<E>(error: &CommandError<E>) -> &'static str {
    match error {
        CommandError::UnknownCommand => "UNKNOWN COMMAND",
        CommandError::MalformedArgument(_) => "MALFORMED ARGUMENT",
        CommandError::Actuator(_) => "ACTUATOR FAULT",
    }
}

fn summary_line(summary: &RunSummary) -> StatusLine {
    let mut line = StatusLine::new();
    let _ = write!(
        line,
        "Replay {}: {} cycles, {} blocks, {} commands, {} rejected",
        if summary.interrupted { "stopped" } else { "done" },
        summary.cycles_completed,
        summary.blocks_executed,
        summary.commands_executed,
        summary.commands_rejected,
    );
    line
}
