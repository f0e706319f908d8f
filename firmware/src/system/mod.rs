//! Hardware bring-up and state shared between tasks
pub mod drivetrain;
pub mod event;
pub mod resources;
pub mod state;
