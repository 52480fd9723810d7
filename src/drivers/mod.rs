// Vibration Monitor — Sensor Sources

#[cfg(target_os = "espidf")]
pub mod accel;
pub mod sim;

use crate::error::SensorError;
use crate::events::AccelSample;

/// Anything that can hand back one 3-axis acceleration sample on demand.
pub trait SensorSource {
    fn fetch(&mut self) -> Result<AccelSample, SensorError>;
}

impl<S: SensorSource + ?Sized> SensorSource for &mut S {
    fn fetch(&mut self) -> Result<AccelSample, SensorError> {
        (**self).fetch()
    }
}

impl<S: SensorSource + ?Sized> SensorSource for Box<S> {
    fn fetch(&mut self) -> Result<AccelSample, SensorError> {
        (**self).fetch()
    }
}
