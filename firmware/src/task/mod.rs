//! Embassy tasks
pub mod control;
pub mod mode_button;
pub mod odometry_drain;
pub mod pulse_count;
pub mod serial_console;
pub mod status_output;
