//! Movement scripts replayed against a mock chassis

use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use chassis_control::chassis::{Chassis, Direction, WheelDrive};
use chassis_control::config::Config;
use chassis_control::dispatch::CommandDispatcher;
use chassis_control::mode::{ModeFlag, ModeSwitch, OperationMode};
use chassis_control::odometry::OdometryAccumulator;
use chassis_control::runner::{ScriptRunner, TextScript};
use chassis_control::{Wheel, NUM_WHEELS};
use embassy_futures::block_on;
use embedded_hal::digital::{ErrorType, OutputPin};
use embedded_hal_async::delay::DelayNs;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Event {
    Drive(Wheel, Direction, u8),
    Light(usize, bool),
    Sleep(u32),
}

type Log = Rc<RefCell<Vec<Event>>>;

struct Motors(Log);

impl WheelDrive for Motors {
    type Error = Infallible;

    fn drive(&mut self, wheel: Wheel, direction: Direction, speed: u8) -> Result<(), Infallible> {
        self.0.borrow_mut().push(Event::Drive(wheel, direction, speed));
        Ok(())
    }
}

struct Lamp(usize, Log);

impl ErrorType for Lamp {
    type Error = Infallible;
}

impl OutputPin for Lamp {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.1.borrow_mut().push(Event::Light(self.0, false));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.1.borrow_mut().push(Event::Light(self.0, true));
        Ok(())
    }
}

/// Delay standing in for the pulse interrupts and the drain ticker
///
/// While "sleeping" every wheel that is being driven produces `pulses` edges,
/// then the odometry is drained like the periodic tick would.
struct Clock<'a> {
    log: Log,
    odometry: &'a OdometryAccumulator,
    pulses: u32,
}

impl DelayNs for Clock<'_> {
    async fn delay_ns(&mut self, ns: u32) {
        self.delay_ms(ns / 1_000_000).await;
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.log.borrow_mut().push(Event::Sleep(ms));
        for wheel in Wheel::ALL {
            if wheel_is_driven(&self.log.borrow(), wheel) {
                for _ in 0..self.pulses {
                    self.odometry.record_pulse(wheel);
                }
            }
        }
        self.odometry.drain();
    }
}

fn wheel_is_driven(log: &[Event], wheel: Wheel) -> bool {
    log.iter()
        .rev()
        .find_map(|e| match *e {
            Event::Drive(w, _, speed) if w == wheel => Some(speed > 0),
            _ => None,
        })
        .unwrap_or(false)
}

fn chassis(log: &Log) -> Chassis<Motors, Lamp> {
    Chassis::new(Motors(log.clone()), [0, 1, 2, 3].map(|i| Lamp(i, log.clone())))
}

/// Wheel movements applied, one entry per full set of four drive commands
fn movements(log: &[Event]) -> Vec<[i32; NUM_WHEELS]> {
    let drives: Vec<_> = log
        .iter()
        .filter_map(|e| match *e {
            Event::Drive(wheel, direction, speed) => Some((wheel, direction, speed)),
            _ => None,
        })
        .collect();
    drives
        .chunks(NUM_WHEELS)
        .map(|chunk| {
            let mut movement = [0; NUM_WHEELS];
            for &(wheel, direction, speed) in chunk {
                movement[wheel.index()] = match direction {
                    Direction::Forward => i32::from(speed),
                    Direction::Backward => -i32::from(speed),
                    Direction::Stop => 0,
                };
            }
            movement
        })
        .collect()
}

fn lights_after(log: &[Event]) -> [bool; NUM_WHEELS] {
    let mut lights = [false; NUM_WHEELS];
    for e in log {
        if let Event::Light(i, on) = *e {
            lights[i] = on;
        }
    }
    lights
}

#[test]
fn wheels_duration_fullstop() {
    let script = "\
<MOVEMENT>
WHEELS=(100,100,100,100)
DURATION=10
FULLSTOP
</MOVEMENT>
";
    let log: Log = Rc::default();
    let odometry = OdometryAccumulator::default();
    let clock = Clock {
        log: log.clone(),
        odometry: &odometry,
        pulses: 0,
    };
    let mut dispatcher = CommandDispatcher::new(chassis(&log), clock, &odometry);
    let mode = ModeFlag::new(OperationMode::Automatic);

    let summary = block_on(ScriptRunner::new(1).run(
        &mut TextScript::new(script),
        &mode,
        &mut dispatcher,
    ));

    assert_eq!(summary.commands_executed, 3);
    let log = log.borrow();
    assert_eq!(
        movements(&log),
        [[100; NUM_WHEELS], [0; NUM_WHEELS], [0; NUM_WHEELS]]
    );
    let sleep_at = log.iter().position(|e| *e == Event::Sleep(10)).unwrap();
    let first_stop_at = log
        .iter()
        .position(|e| *e == Event::Drive(Wheel::FrontLeft, Direction::Stop, 0))
        .unwrap();
    assert!(sleep_at < first_stop_at);
    assert_eq!(lights_after(&log), [false; NUM_WHEELS]);
    assert_eq!(dispatcher.actuator().wheel_speed_status().as_str(), "(0,0,0,0)");
}

#[test]
fn lights_follow_movement_until_overridden() {
    let script = "\
<MOVEMENT>
FORWARD=120
LIGHTS=(OFF,OFF,ON,ON)
BACKWARD=80
</MOVEMENT>
";
    let log: Log = Rc::default();
    let odometry = OdometryAccumulator::default();
    let clock = Clock {
        log: log.clone(),
        odometry: &odometry,
        pulses: 0,
    };
    let mut dispatcher = CommandDispatcher::new(chassis(&log), clock, &odometry);
    let mode = ModeFlag::new(OperationMode::Automatic);

    block_on(ScriptRunner::new(1).run(&mut TextScript::new(script), &mode, &mut dispatcher));

    // Override was restored after LIGHTS, so BACKWARD switched to rear lights
    assert_eq!(lights_after(&log.borrow()), [false, false, true, true]);
    assert_eq!(dispatcher.actuator().lights_status().as_str(), "0011");
    assert_eq!(
        movements(&log.borrow()),
        [[120; NUM_WHEELS], [-80; NUM_WHEELS]]
    );
}

#[test]
fn distance_block_stops_after_target() {
    static ODOMETRY: OdometryAccumulator = OdometryAccumulator::new(
        chassis_control::odometry::WheelCalibration::DEFAULT,
    );
    let script = "\
<MOVEMENT>
FORWARD=200
DISTANCE=100
</MOVEMENT>
";
    let log: Log = Rc::default();
    // Half a turn per poll: 106 mm front, 105 mm rear
    let clock = Clock {
        log: log.clone(),
        odometry: &ODOMETRY,
        pulses: 10,
    };
    let mut dispatcher = CommandDispatcher::new(chassis(&log), clock, &ODOMETRY);
    let mode = ModeFlag::new(OperationMode::Automatic);

    let summary = block_on(ScriptRunner::new(1).run(
        &mut TextScript::new(script),
        &mode,
        &mut dispatcher,
    ));

    assert_eq!(summary.commands_executed, 2);
    let log = log.borrow();
    // 1000 mm on the rear wheels takes ten polls
    assert_eq!(log.iter().filter(|e| matches!(e, Event::Sleep(_))).count(), 10);
    assert_eq!(movements(&log), [[200; NUM_WHEELS], [0; NUM_WHEELS]]);
    assert_eq!(ODOMETRY.distances(), [0; NUM_WHEELS]);
}

#[test]
fn configured_cycles_drive_the_replay() {
    let (config, rejected) = Config::parse("CYCLE=2;LIGHTS=OFF;");
    assert_eq!(rejected, 0);

    let script = "<MOVEMENT>\nFORWARD=50\nFULLSTOP\n</MOVEMENT>\n";
    let log: Log = Rc::default();
    let odometry = OdometryAccumulator::default();
    let clock = Clock {
        log: log.clone(),
        odometry: &odometry,
        pulses: 0,
    };
    let mut chassis = chassis(&log);
    chassis.set_lights_enabled(config.lights_enabled);
    let mut dispatcher = CommandDispatcher::new(chassis, clock, &odometry);
    let mode = ModeFlag::new(OperationMode::Automatic);

    let summary = block_on(ScriptRunner::new(config.run_cycles).run(
        &mut TextScript::new(script),
        &mode,
        &mut dispatcher,
    ));

    assert_eq!(summary.cycles_completed, 2);
    assert_eq!(movements(&log.borrow()).len(), 4);
    assert!(!log.borrow().iter().any(|e| matches!(e, Event::Light(..))));
}

/// Switches to manual once the first FULLSTOP has been applied
struct StopWatcher<'a>(&'a Log);

impl ModeSwitch for StopWatcher<'_> {
    fn is_manual(&self) -> bool {
        movements(&self.0.borrow()).contains(&[0; NUM_WHEELS])
    }
}

#[test]
fn manual_switch_ends_replay_between_blocks() {
    let script = "\
<MOVEMENT>
FORWARD=50
FULLSTOP
</MOVEMENT>
<MOVEMENT>
BACKWARD=50
</MOVEMENT>
";
    let log: Log = Rc::default();
    let odometry = OdometryAccumulator::default();
    let clock = Clock {
        log: log.clone(),
        odometry: &odometry,
        pulses: 0,
    };
    let mut dispatcher = CommandDispatcher::new(chassis(&log), clock, &odometry);

    let summary = block_on(ScriptRunner::new(5).run(
        &mut TextScript::new(script),
        &StopWatcher(&log),
        &mut dispatcher,
    ));

    assert!(summary.interrupted);
    assert_eq!(summary.blocks_executed, 1);
    assert_eq!(movements(&log.borrow()), [[50; NUM_WHEELS], [0; NUM_WHEELS]]);
}
