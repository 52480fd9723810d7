// Vibration Monitor — Simulated Accelerometer
//
// Stands in for the IIS2DLPC on the host: a sine vibration on every axis at a
// fixed frequency, plus seeded uniform noise and 1 g of gravity on Z. Time
// advances by one sample period per fetch, so the signal is independent of
// how fast the host actually runs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::STANDARD_GRAVITY;
use crate::drivers::SensorSource;
use crate::error::SensorError;
use crate::events::AccelSample;

pub struct SimulatedAccelerometer {
    vibration_hz: f64,
    amplitude: f64,
    noise: f64,
    sample_hz: f64,
    n: u64,
    rng: StdRng,
}

impl SimulatedAccelerometer {
    pub fn new(vibration_hz: f64, amplitude: f64, noise: f64, sample_hz: u32, seed: u64) -> Self {
        Self {
            vibration_hz,
            amplitude,
            noise,
            sample_hz: f64::from(sample_hz.max(1)),
            n: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn jitter(&mut self) -> f64 {
        if self.noise > 0.0 {
            self.rng.gen_range(-self.noise..self.noise)
        } else {
            0.0
        }
    }
}

impl SensorSource for SimulatedAccelerometer {
    fn fetch(&mut self) -> Result<AccelSample, SensorError> {
        let t = self.n as f64 / self.sample_hz;
        self.n += 1;

        let phase = 2.0 * std::f64::consts::PI * self.vibration_hz * t;
        let wave = self.amplitude * phase.sin();

        Ok(AccelSample {
            x: wave + self.jitter(),
            y: 0.5 * wave + self.jitter(),
            z: STANDARD_GRAVITY + 0.25 * wave + self.jitter(),
        })
    }
}
