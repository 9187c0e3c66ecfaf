// lib.rs
//
// Hardware drivers for the Vigil agent, generic over the embedded-hal and
// embedded-io bus traits so they run unchanged against real peripherals or
// the SITL harness mocks.
#![cfg_attr(not(test), no_std)]

pub mod gps;
pub mod imu;
pub mod modem;

pub use gps::GpsUart;
pub use imu::Mpu6050;
pub use modem::Sim800;
