// Vibration Monitor — IIS2DLPC Accelerometer Driver
//
// Register-level driver over I2C, owned exclusively by the sampler.
// Avoids external crate version conflicts with esp-idf-hal.

use esp_idf_hal::i2c::I2cDriver;

use crate::config::*;
use crate::drivers::SensorSource;
use crate::error::SensorError;
use crate::events::AccelSample;

// IIS2DLPC register addresses
const REG_WHO_AM_I: u8 = 0x0F;
const REG_CTRL1: u8 = 0x20;
const REG_CTRL2: u8 = 0x21;
const REG_CTRL6: u8 = 0x25;
const REG_OUT_X_L: u8 = 0x28; // Start of 6-byte XYZ burst
const WHO_AM_I_EXPECTED: u8 = 0x44;

// CTRL1: ODR 400 Hz, high-performance mode
const CTRL1_ODR_400_HP: u8 = 0x74;
// CTRL2: block data update + register auto-increment
const CTRL2_BDU_IF_ADD_INC: u8 = 0x0C;
// CTRL6: ±2 g full scale, low-noise enabled
const CTRL6_FS_2G_LOW_NOISE: u8 = 0x04;

pub struct Iis2dlpc {
    bus: I2cDriver<'static>,
}

impl Iis2dlpc {
    pub fn new(bus: I2cDriver<'static>) -> Self {
        Self { bus }
    }

    /// Read WHO_AM_I; `Ok` only when the expected part answers.
    pub fn probe(&mut self) -> Result<(), SensorError> {
        let mut buf = [0u8; 1];
        self.bus
            .write_read(I2C_ADDR_IIS2DLPC, &[REG_WHO_AM_I], &mut buf, I2C_TIMEOUT_TICKS)
            .map_err(|e| SensorError::Fetch(e.to_string()))?;

        if buf[0] == WHO_AM_I_EXPECTED {
            Ok(())
        } else {
            Err(SensorError::NotDetected { who_am_i: buf[0] })
        }
    }

    /// Configure 400 Hz ODR, high-performance 14-bit mode, ±2 g.
    pub fn init(&mut self) -> Result<(), SensorError> {
        for (reg, value) in [
            (REG_CTRL2, CTRL2_BDU_IF_ADD_INC),
            (REG_CTRL6, CTRL6_FS_2G_LOW_NOISE),
            (REG_CTRL1, CTRL1_ODR_400_HP),
        ] {
            self.bus
                .write(I2C_ADDR_IIS2DLPC, &[reg, value], I2C_TIMEOUT_TICKS)
                .map_err(|e| SensorError::Fetch(e.to_string()))?;
        }

        log::info!("IIS2DLPC initialised (±2g, 400Hz, high-performance)");
        Ok(())
    }
}

impl SensorSource for Iis2dlpc {
    /// Burst-read the three axes and convert to m/s².
    fn fetch(&mut self) -> Result<AccelSample, SensorError> {
        let mut raw = [0u8; 6];
        self.bus
            .write_read(I2C_ADDR_IIS2DLPC, &[REG_OUT_X_L], &mut raw, I2C_TIMEOUT_TICKS)
            .map_err(|e| SensorError::Fetch(e.to_string()))?;

        Ok(AccelSample {
            x: to_ms2([raw[0], raw[1]]),
            y: to_ms2([raw[2], raw[3]]),
            z: to_ms2([raw[4], raw[5]]),
        })
    }
}

/// 14-bit left-justified little-endian sample to m/s².
fn to_ms2(bytes: [u8; 2]) -> f64 {
    let counts = i16::from_le_bytes(bytes) >> 2;
    counts as f64 * ACCEL_MG_PER_LSB_2G / 1000.0 * STANDARD_GRAVITY
}
