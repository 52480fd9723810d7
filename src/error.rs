// Vibration Monitor — Error Types
//
// Every error here is fatal: the pipeline stops and the diagnostic is logged.
// Detection failures (no winner, ambiguous window, high failure rate) are
// verdict data, not errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SensorError {
    #[error("accelerometer sample fetch failed: {0}")]
    Fetch(String),

    #[error("accelerometer not detected (WHO_AM_I = {who_am_i:#04x})")]
    NotDetected { who_am_i: u8 },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("run_classifier returned {code}")]
pub struct ClassifierError {
    pub code: i32,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("at least one axis must be enabled")]
    NoAxes,

    #[error("sampling frequency must be at least 2 Hz, got {0}")]
    SamplingRate(u32),

    #[error("window size must be within 4..=255, got {0}")]
    WindowSize(usize),

    #[error("good label index {0} is outside the model's label range")]
    GoodLabel(usize),

    #[error("{enabled} axes enabled but the model was trained on {expected}")]
    AxisArity { enabled: usize, expected: usize },

    #[error("frame size {frame_size} is not a whole number of {arity}-axis samples")]
    FrameSize { frame_size: usize, arity: usize },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Sensor(#[from] SensorError),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("report output failed: {0}")]
    Report(#[from] std::io::Error),
}
