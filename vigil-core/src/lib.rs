// lib.rs
#![cfg_attr(not(test), no_std)]

pub mod clock;
pub mod gps;
pub mod imu;
pub mod link;
pub mod state_machine;
pub mod telemetry;
pub mod types;

mod macros;

// Re-exported for the logging macros.
pub use log;

pub use clock::{ClockService, TimeSource};
pub use gps::parser::process_line;
pub use gps::types::*;
pub use imu::*;
pub use link::*;
pub use state_machine::*;
pub use telemetry::*;
pub use types::*;
