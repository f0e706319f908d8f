//! Control core for a four-wheeled robot chassis
//!
//! Tracks how far each wheel has travelled from interrupt-driven pulse counters
//! and executes movement scripts made of `<MOVEMENT>` blocks against an
//! actuator, gating blocking commands on the accumulated odometry.
//!
//! The crate is hardware independent. The firmware binds it to real pins
//! through the [`dispatch::Actuator`], [`chassis::WheelDrive`],
//! [`mode::ModeSwitch`] and [`runner::ScriptSource`] traits, and to time
//! through `embedded_hal_async::delay::DelayNs`.
//!
//! # Data flow
//! - sensor edges → [`odometry::PulseCounter`] (interrupt context)
//! - periodic [`odometry::OdometryAccumulator::drain`] → cumulative distances
//! - script text → [`script::ScriptParser`] → [`dispatch::CommandDispatcher`]
//! - `DISTANCE` commands poll the accumulator until every wheel reached the target

#![cfg_attr(not(test), no_std)]

#[cfg(all(feature = "defmt", feature = "log"))]
compile_error!("features `defmt` and `log` are mutually exclusive");

// Must come first so the logging macros are visible to the other modules
mod fmt;

pub mod chassis;
pub mod command;
pub mod config;
pub mod console;
pub mod dispatch;
pub mod framing;
pub mod mode;
pub mod odometry;
pub mod runner;
pub mod script;
pub mod wheel;

pub use wheel::{Wheel, NUM_WHEELS};
