// Vibration Monitor — Fixed-rate Frame Sampler
//
// Fills one feature frame per call: for every time-step a one-shot deadline is
// armed, a sample is fetched, the enabled axes are packed X → Y → Z into the
// next contiguous slice, and the thread blocks until the deadline before the
// next step. The last step does not wait. A fetch that overruns the period
// simply leaves no gap before the next fetch.

use std::thread;
use std::time::{Duration, Instant};

use crate::config::{AxisSet, TimerMode};
use crate::drivers::SensorSource;
use crate::error::SensorError;

/// Period between samples for a nominal sampling frequency. Divides by
/// `hz - 1` so the achieved rate sits slightly below nominal and absorbs
/// fetch latency.
pub fn sample_period(sampling_hz: u32) -> Duration {
    let divisor = u64::from(sampling_hz.saturating_sub(1).max(1));
    Duration::from_micros(1_000_000 / divisor)
}

/// One-shot deadline timer, re-armed every time-step.
pub trait DeadlineTimer {
    /// Arm the timer to expire `period` from now.
    fn start(&mut self, period: Duration);
    /// Block until the armed deadline has passed. Returns at once if it
    /// already has, or if nothing is armed.
    fn wait(&mut self);
}

/// Busy-waits on the monotonic clock.
#[derive(Debug, Default)]
pub struct SpinTimer {
    deadline: Option<Instant>,
}

impl DeadlineTimer for SpinTimer {
    fn start(&mut self, period: Duration) {
        self.deadline = Some(Instant::now() + period);
    }

    fn wait(&mut self) {
        if let Some(deadline) = self.deadline.take() {
            while Instant::now() < deadline {
                std::hint::spin_loop();
            }
        }
    }
}

/// Sleeps for the remainder of the period.
#[derive(Debug, Default)]
pub struct SleepTimer {
    deadline: Option<Instant>,
}

impl DeadlineTimer for SleepTimer {
    fn start(&mut self, period: Duration) {
        self.deadline = Some(Instant::now() + period);
    }

    fn wait(&mut self) {
        if let Some(deadline) = self.deadline.take() {
            let now = Instant::now();
            if now < deadline {
                thread::sleep(deadline - now);
            }
        }
    }
}

/// Either timer, picked at runtime from [`TimerMode`].
#[derive(Debug)]
pub enum Timer {
    Spin(SpinTimer),
    Sleep(SleepTimer),
}

impl From<TimerMode> for Timer {
    fn from(mode: TimerMode) -> Self {
        match mode {
            TimerMode::Spin => Self::Spin(SpinTimer::default()),
            TimerMode::Sleep => Self::Sleep(SleepTimer::default()),
        }
    }
}

impl DeadlineTimer for Timer {
    fn start(&mut self, period: Duration) {
        match self {
            Self::Spin(t) => t.start(period),
            Self::Sleep(t) => t.start(period),
        }
    }

    fn wait(&mut self) {
        match self {
            Self::Spin(t) => t.wait(),
            Self::Sleep(t) => t.wait(),
        }
    }
}

pub struct FrameSampler<S, T> {
    sensor: S,
    timer: T,
    axes: AxisSet,
    period: Duration,
    features: Vec<f32>,
}

impl<S: SensorSource, T: DeadlineTimer> FrameSampler<S, T> {
    /// `frame_size` is the total number of floats per frame; the buffer is
    /// allocated here once and reused for every frame.
    pub fn new(sensor: S, timer: T, axes: AxisSet, frame_size: usize, sampling_hz: u32) -> Self {
        Self {
            sensor,
            timer,
            axes,
            period: sample_period(sampling_hz),
            features: vec![0.0; frame_size],
        }
    }

    pub fn axes(&self) -> AxisSet {
        self.axes
    }

    pub fn frame_size(&self) -> usize {
        self.features.len()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Time-steps per frame.
    pub fn frame_samples(&self) -> usize {
        match self.axes.count() {
            0 => 0,
            n => self.features.len() / n,
        }
    }

    /// Sample a full frame. Any fetch error aborts the frame.
    pub fn acquire_frame(&mut self) -> Result<&[f32], SensorError> {
        let stride = self.axes.count();
        let steps = self.frame_samples();

        for step in 0..steps {
            self.timer.start(self.period);

            let sample = self.sensor.fetch()?;

            let slot = &mut self.features[step * stride..(step + 1) * stride];
            for (value, axis) in slot.iter_mut().zip(self.axes.iter()) {
                *value = sample.axis(axis) as f32;
            }

            if step + 1 < steps {
                self.timer.wait();
            }
        }

        log::debug!("Frame acquired: {} samples x {} axes", steps, stride);
        Ok(&self.features)
    }
}
