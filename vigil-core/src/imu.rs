// imu.rs
//
// Register-level decode for the 6-axis IMU. The bus transaction itself lives
// in vigil-drivers; this module turns a raw 14-byte burst into engineering
// units and keeps the derived magnitudes in sync with the raw axes.

use libm::{fabsf, sqrtf};

/// LSB/g at the ±2 g accelerometer range.
pub const ACCEL_SCALE: f32 = 16384.0;
/// LSB/(deg/s) at the ±250 °/s gyroscope range.
pub const GYRO_SCALE: f32 = 131.0;

/// One tick's worth of inertial data, in g and deg/s.
///
/// The derived fields are always computed from the raw axes via
/// [`ImuSample::from_axes`]; they are never set independently.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ImuSample {
    pub accel: [f32; 3],
    pub gyro: [f32; 3],
    pub accel_magnitude: f32,
    pub gyro_magnitude: f32,
    /// Deviation of the acceleration magnitude from 1 g at rest.
    pub accel_change: f32,
}

impl ImuSample {
    /// Builds a sample and computes the derived magnitudes.
    pub fn from_axes(accel: [f32; 3], gyro: [f32; 3]) -> Self {
        let accel_magnitude = magnitude(accel);
        let gyro_magnitude = magnitude(gyro);
        Self {
            accel,
            gyro,
            accel_magnitude,
            gyro_magnitude,
            accel_change: fabsf(accel_magnitude - 1.0),
        }
    }

    /// Substitute sample for a faulted read. All fields are zero, including
    /// `accel_change`, so a bus error never registers as motion activity.
    pub const fn zeroed() -> Self {
        Self {
            accel: [0.0; 3],
            gyro: [0.0; 3],
            accel_magnitude: 0.0,
            gyro_magnitude: 0.0,
            accel_change: 0.0,
        }
    }

    /// Raw six-axis tuple buffered by the accident-detection window.
    pub const fn six_axis(&self) -> [f32; 6] {
        [
            self.accel[0],
            self.accel[1],
            self.accel[2],
            self.gyro[0],
            self.gyro[1],
            self.gyro[2],
        ]
    }
}

fn magnitude(v: [f32; 3]) -> f32 {
    sqrtf(v[0] * v[0] + v[1] * v[1] + v[2] * v[2])
}

/// Decodes the 14-byte burst read starting at ACCEL_XOUT_H.
///
/// Layout: accel X/Y/Z as big-endian i16 pairs, two temperature bytes that
/// are skipped, then gyro X/Y/Z as big-endian i16 pairs.
pub fn decode_burst(raw: &[u8; 14]) -> ImuSample {
    let axis = |hi: u8, lo: u8| i16::from_be_bytes([hi, lo]) as f32;

    let accel = [
        axis(raw[0], raw[1]) / ACCEL_SCALE,
        axis(raw[2], raw[3]) / ACCEL_SCALE,
        axis(raw[4], raw[5]) / ACCEL_SCALE,
    ];
    let gyro = [
        axis(raw[8], raw[9]) / GYRO_SCALE,
        axis(raw[10], raw[11]) / GYRO_SCALE,
        axis(raw[12], raw[13]) / GYRO_SCALE,
    ];

    ImuSample::from_axes(accel, gyro)
}

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ImuSensorError {
    BusError,
    DeviceMissing,
    InvalidData,
}
