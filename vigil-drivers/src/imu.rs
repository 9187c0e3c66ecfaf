// imu.rs
use embedded_hal::i2c::I2c;
use vigil_core::imu::{decode_burst, ImuSample, ImuSensorError};
use vigil_core::info;

/// MPU6050 6-axis IMU on I2C.
pub struct Mpu6050<I2C> {
    i2c: I2C,
}

impl<I2C: I2c> Mpu6050<I2C> {
    // Default address with AD0 low.
    const ADDR: u8 = 0x68;

    const WHO_AM_I: u8 = 0x75;
    const PWR_MGMT_1: u8 = 0x6B;
    const ACCEL_XOUT_H: u8 = 0x3B;

    pub fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    /// Verifies the device is present and wakes it from sleep. The part
    /// powers up at the default ±2 g / ±250 °/s ranges, which is what the
    /// decode scale factors assume.
    pub fn init(&mut self) -> Result<(), ImuSensorError> {
        let mut id = [0u8; 1];
        self.i2c
            .write_read(Self::ADDR, &[Self::WHO_AM_I], &mut id)
            .map_err(|_| ImuSensorError::BusError)?;

        if id[0] != Self::ADDR {
            return Err(ImuSensorError::DeviceMissing);
        }

        // Clear the SLEEP bit.
        self.i2c
            .write(Self::ADDR, &[Self::PWR_MGMT_1, 0x00])
            .map_err(|_| ImuSensorError::BusError)?;

        info!("MPU6050: online (+/-2g, 250dps)");
        Ok(())
    }

    /// Burst-reads accel, temperature and gyro in one transaction so the
    /// axes stay coherent, then decodes to engineering units.
    pub fn read(&mut self) -> Result<ImuSample, ImuSensorError> {
        let mut buf = [0u8; 14];
        self.i2c
            .write_read(Self::ADDR, &[Self::ACCEL_XOUT_H], &mut buf)
            .map_err(|_| ImuSensorError::BusError)?;
        Ok(decode_burst(&buf))
    }
}
